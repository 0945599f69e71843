// src/common/i18n.rs

use serde_json::Value;
use std::collections::HashMap;

pub const DEFAULT_LANG: &str = "pt";

// Catálogos embutidos no binário
const PT: &str = r#"{
    "validation_error": "Um ou mais campos são inválidos.",
    "decision_note_required": "Parecer do analista é obrigatório.",
    "analyst_required": "Atribua um analista antes de tirar a ficha de Recebido.",
    "invalid_transition": "Esta ação não é permitida na coluna atual.",
    "permission_denied": "Você não tem permissão para realizar esta ação.",
    "invalid_token": "Token de autenticação inválido ou ausente.",
    "profile_not_found": "Perfil não encontrado.",
    "resource_not_found": "Registro não encontrado.",
    "delete_reason_required": "Informe o motivo da exclusão.",
    "invalid_time_slot": "Horário indisponível na agenda.",
    "invalid_header": "Cabeçalho da requisição inválido.",
    "collaborator_failure": "Não foi possível salvar no servidor. Tente novamente.",
    "internal_error": "Ocorreu um erro inesperado."
}"#;

const EN: &str = r#"{
    "validation_error": "One or more fields are invalid.",
    "decision_note_required": "The analyst's decision note is required.",
    "analyst_required": "Assign an analyst before moving the application out of Received.",
    "invalid_transition": "This action is not allowed in the current column.",
    "permission_denied": "You are not allowed to perform this action.",
    "invalid_token": "Invalid or missing authentication token.",
    "profile_not_found": "Profile not found.",
    "resource_not_found": "Record not found.",
    "delete_reason_required": "A reason is required to delete an application.",
    "invalid_time_slot": "Time slot not available in the schedule.",
    "invalid_header": "Invalid request header.",
    "collaborator_failure": "Could not save to the server. Please try again.",
    "internal_error": "An unexpected error occurred."
}"#;

/// Mensagens de erro por idioma, indexadas pelo código do erro.
#[derive(Debug, Clone)]
pub struct I18nStore {
    catalogs: HashMap<String, HashMap<String, String>>,
}

impl I18nStore {
    pub fn new() -> Self {
        let mut catalogs = HashMap::new();
        catalogs.insert("pt".to_string(), parse_catalog(PT));
        catalogs.insert("en".to_string(), parse_catalog(EN));
        Self { catalogs }
    }

    /// Busca no idioma pedido, cai para o padrão e por último devolve o próprio código.
    pub fn translate(&self, lang: &str, code: &str) -> String {
        self.catalogs
            .get(lang)
            .and_then(|c| c.get(code))
            .or_else(|| self.catalogs.get(DEFAULT_LANG).and_then(|c| c.get(code)))
            .cloned()
            .unwrap_or_else(|| code.to_string())
    }
}

impl Default for I18nStore {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_catalog(raw: &str) -> HashMap<String, String> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => map
            .into_iter()
            .filter_map(|(k, v)| v.as_str().map(|s| (k, s.to_string())))
            .collect(),
        _ => {
            tracing::error!("Catálogo de mensagens inválido");
            HashMap::new()
        }
    }
}
