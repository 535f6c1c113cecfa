//! Follow-up message templates.
//!
//! One fixed Spanish text per follow-up kind. A `tipo` value that does not
//! parse falls back to the day-3 text.

use crate::core::follow_up::FollowUpKind;

/// Content variant recorded on follow-ups whose message was delivered.
pub const TEMPLATE_VARIANT: &str = "plantilla_v1";

/// Content variant recorded on email follow-ups closed without a transport.
pub const UNSENT_VARIANT: &str = "sin_envio";

/// Body text for a kind; `{numero}` is replaced with the quote number.
#[must_use]
pub const fn template(kind: FollowUpKind) -> &'static str {
    match kind {
        FollowUpKind::Day3 => {
            "¿Pudiste revisar el presupuesto {numero} que te enviamos? \
             Quedamos atentos a cualquier consulta."
        }
        FollowUpKind::Day7 => {
            "Te escribimos para saber si tienes alguna duda sobre el presupuesto {numero}. \
             Podemos ajustarlo a lo que necesites."
        }
        FollowUpKind::PreExpiry => {
            "Te recordamos que el presupuesto {numero} vence mañana. \
             Si quieres avanzar, responde a este mensaje y lo gestionamos."
        }
    }
}

/// Renders the message for a stored `tipo` value.
#[must_use]
pub fn render_message(kind: &str, lead_name: &str, quote_number: &str) -> String {
    let kind = FollowUpKind::parse(kind).unwrap_or(FollowUpKind::Day3);
    let name = lead_name.trim();
    let greeting = if name.is_empty() {
        "Hola,".to_string()
    } else {
        format!("Hola {name},")
    };
    format!(
        "{greeting} {}",
        template(kind).replace("{numero}", quote_number)
    )
}

/// Subject line for email follow-ups.
#[must_use]
pub fn email_subject(quote_number: &str) -> String {
    format!("Seguimiento de su presupuesto {quote_number}")
}
