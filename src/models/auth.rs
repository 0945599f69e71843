// src/models/auth.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// Mapeia o CREATE TYPE user_role do banco
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    AnalistaPremium,
    Reanalista,
    Comercial,
}

/// O que cada papel pode fazer no quadro e na agenda.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    /// Ingressar, aprovar/negar em análise, mover, finalizar
    ApplicationsDecide,
    /// Aprovar/negar enquanto a ficha está em reanálise
    ReanalysisDecide,
    ApplicationsCreate,
    ApplicationsDelete,
    AgendaWrite,
}

impl Permission {
    pub fn slug(self) -> &'static str {
        match self {
            Permission::ApplicationsDecide => "applications:decide",
            Permission::ReanalysisDecide => "reanalysis:decide",
            Permission::ApplicationsCreate => "applications:create",
            Permission::ApplicationsDelete => "applications:delete",
            Permission::AgendaWrite => "agenda:write",
        }
    }
}

impl UserRole {
    pub fn allows(self, permission: Permission) -> bool {
        match self {
            UserRole::AnalistaPremium => true,
            UserRole::Reanalista => matches!(permission, Permission::ReanalysisDecide),
            UserRole::Comercial => matches!(
                permission,
                Permission::ApplicationsCreate | Permission::AgendaWrite
            ),
        }
    }
}

// Perfil vindo da tabela 'profiles'
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: Uuid,
    #[schema(example = "Bruno")]
    pub full_name: Option<String>,
    pub role: UserRole,
    pub company_id: Option<Uuid>,
}

impl Profile {
    pub fn can(&self, permission: Permission) -> bool {
        self.role.allows(permission)
    }

    /// Premium enxerga todas as empresas; os demais só a própria.
    pub fn sees_all_companies(&self) -> bool {
        self.role == UserRole::AnalistaPremium
    }

    pub fn same_company(&self, target: Option<Uuid>) -> bool {
        match (self.company_id, target) {
            (Some(mine), Some(theirs)) => mine == theirs,
            _ => false,
        }
    }
}

// Estrutura de dados ("claims") dentro do JWT
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,  // Subject (ID do perfil)
    pub exp: usize, // Expiration time (quando o token expira)
    #[serde(default)]
    pub iat: usize, // Issued At (quando o token foi criado)
}
