// src/models/agenda.rs

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Horários de visita disponíveis no dia.
pub const TIMES: [&str; 4] = ["08:30", "10:30", "13:30", "15:30"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "agenda_tecnico")]
pub enum Tecnico {
    Alessandro,
    Fabio,
    Gustavo,
    Jorge,
    Matheus,
    #[serde(rename = "Cássio")]
    #[sqlx(rename = "Cássio")]
    Cassio,
    Italo,
    Francisco,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "agenda_cidade")]
pub enum Cidade {
    #[serde(rename = "Cruzeiro da Fortaleza")]
    #[sqlx(rename = "Cruzeiro da Fortaleza")]
    CruzeiroDaFortaleza,
    #[serde(rename = "Patrocínio")]
    #[sqlx(rename = "Patrocínio")]
    Patrocinio,
    #[serde(rename = "Guimarânia")]
    #[sqlx(rename = "Guimarânia")]
    Guimarania,
    Tejuco,
    #[serde(rename = "São João da Serra Negra")]
    #[sqlx(rename = "São João da Serra Negra")]
    SaoJoaoDaSerraNegra,
    #[serde(rename = "Salitre de Minas")]
    #[sqlx(rename = "Salitre de Minas")]
    SalitreDeMinas,
    #[serde(rename = "Serra do Salitre")]
    #[sqlx(rename = "Serra do Salitre")]
    SerraDoSalitre,
    #[serde(rename = "Zona Rural")]
    #[sqlx(rename = "Zona Rural")]
    ZonaRural,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "agenda_etiqueta")]
pub enum Etiqueta {
    Aprovado,
    #[serde(rename = "Mud End + Manutenção")]
    #[sqlx(rename = "Mud End + Manutenção")]
    MudancaEnderecoManutencao,
    #[serde(rename = "Já instalados")]
    #[sqlx(rename = "Já instalados")]
    JaInstalados,
    Negados,
    #[serde(rename = "Reanálise")]
    #[sqlx(rename = "Reanálise")]
    Reanalise,
    #[serde(rename = "Salitre/Serra/Tejuco")]
    #[sqlx(rename = "Salitre/Serra/Tejuco")]
    SalitreSerraTejuco,
    #[serde(rename = "Guimarânia/São João/Cruzeiro")]
    #[sqlx(rename = "Guimarânia/São João/Cruzeiro")]
    GuimaraniaSaoJoaoCruzeiro,
    #[serde(rename = "Zona Rural")]
    #[sqlx(rename = "Zona Rural")]
    ZonaRural,
}

impl Etiqueta {
    /// Etiqueta regional sugerida para a cidade da visita.
    pub fn suggest_for(cidade: Cidade) -> Option<Etiqueta> {
        match cidade {
            Cidade::SalitreDeMinas | Cidade::Tejuco | Cidade::SerraDoSalitre => {
                Some(Etiqueta::SalitreSerraTejuco)
            }
            Cidade::Guimarania | Cidade::SaoJoaoDaSerraNegra | Cidade::CruzeiroDaFortaleza => {
                Some(Etiqueta::GuimaraniaSaoJoaoCruzeiro)
            }
            Cidade::ZonaRural => Some(Etiqueta::ZonaRural),
            Cidade::Patrocinio => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AgendaItem {
    pub id: Uuid,
    #[schema(example = "Maria Souza")]
    pub cliente: String,
    pub telefone: Option<String>,
    pub cidade: Cidade,
    pub tecnico: Tecnico,
    pub etiqueta: Etiqueta,
    pub obs: Option<String>,
    #[schema(example = "2025-03-10")]
    pub dia: NaiveDate,
    #[schema(example = "08:30")]
    pub horario: String,
    // Etiqueta azul no calendário
    pub manutencao: bool,
}

/// Alterações parciais de um agendamento.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AgendaPatch {
    pub cliente: Option<String>,
    pub telefone: Option<String>,
    pub cidade: Option<Cidade>,
    pub tecnico: Option<Tecnico>,
    pub etiqueta: Option<Etiqueta>,
    pub obs: Option<String>,
    pub dia: Option<NaiveDate>,
    pub horario: Option<String>,
    pub manutencao: Option<bool>,
}

impl AgendaPatch {
    pub fn apply_to(self, item: &mut AgendaItem) {
        if let Some(cliente) = self.cliente {
            item.cliente = cliente;
        }
        if let Some(telefone) = self.telefone {
            item.telefone = Some(telefone);
        }
        if let Some(cidade) = self.cidade {
            item.cidade = cidade;
        }
        if let Some(tecnico) = self.tecnico {
            item.tecnico = tecnico;
        }
        if let Some(etiqueta) = self.etiqueta {
            item.etiqueta = etiqueta;
        }
        if let Some(obs) = self.obs {
            item.obs = Some(obs);
        }
        if let Some(dia) = self.dia {
            item.dia = dia;
        }
        if let Some(horario) = self.horario {
            item.horario = horario;
        }
        if let Some(manutencao) = self.manutencao {
            item.manutencao = manutencao;
        }
    }
}
