use barberia_core::domain::appointment::Appointment;
use barberia_core::domain::catalog::CatalogBundle;

use crate::llm::ChatMessage;

const RESPONSE_FORMAT: &str = r#"Se l'utente vuole prenotare, rispondi SOLO con un oggetto JSON in questo formato:
{
  "action": "book",
  "appointment": {
    "clientName": "nome cliente",
    "service": "nome servizio esatto dalla lista",
    "date": "YYYY-MM-DD",
    "time": "HH:MM"
  }
}

Se vuoi solo rispondere senza prenotare, rispondi SOLO con:
{
  "action": "reply",
  "message": "tua risposta"
}

IMPORTANTE: Rispondi SOLO con JSON valido, niente altro testo prima o dopo."#;

/// Context sent with every turn: shop name, the full appointment list, the service list and
/// opening hours, followed by the reply contract.
pub fn system_prompt(catalog: &CatalogBundle, appointments: &[Appointment]) -> String {
    let appointments_json =
        serde_json::to_string_pretty(appointments).unwrap_or_else(|_| "[]".to_string());
    let services = catalog
        .services
        .iter()
        .map(|service| format!("- {}: {}min, €{}", service.name, service.duration, service.price))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Sei l'assistente AI di un barbiere. Il negozio si chiama \"{shop}\".\n\n\
         APPUNTAMENTI ESISTENTI:\n{appointments_json}\n\n\
         SERVIZI DISPONIBILI:\n{services}\n\n\
         ORARI: {start} - {end}\n\n\
         {RESPONSE_FORMAT}",
        shop = catalog.shop.shop_name,
        start = catalog.shop.work_hours.start,
        end = catalog.shop.work_hours.end,
    )
}

/// Only the current user message travels with the system context; earlier turns are not
/// replayed to the model.
pub fn turn_messages(
    catalog: &CatalogBundle,
    appointments: &[Appointment],
    user_message: &str,
) -> Vec<ChatMessage> {
    vec![ChatMessage::system(system_prompt(catalog, appointments)), ChatMessage::user(user_message)]
}
