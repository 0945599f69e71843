// src/services/auth.rs

use jsonwebtoken::{decode, DecodingKey, Validation};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::ProfileStore,
    models::auth::{Claims, Profile},
};

/// Valida os tokens emitidos pelo backend hospedado. Login e cadastro
/// acontecem lá; aqui só conferimos a assinatura e buscamos o perfil.
#[derive(Clone)]
pub struct AuthService {
    profiles: Arc<dyn ProfileStore>,
    jwt_secret: String,
    jwt_audience: Option<String>,
}

impl AuthService {
    pub fn new(profiles: Arc<dyn ProfileStore>, jwt_secret: String, jwt_audience: Option<String>) -> Self {
        Self { profiles, jwt_secret, jwt_audience }
    }

    pub async fn validate_token(&self, token: &str) -> Result<Profile, AppError> {
        let mut validation = Validation::default();
        match &self.jwt_audience {
            Some(aud) => validation.set_audience(&[aud.as_str()]),
            None => validation.validate_aud = false,
        }

        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_ref()),
            &validation,
        )
        .map_err(|_| AppError::InvalidToken)?;

        self.find_profile(token_data.claims.sub).await
    }

    pub async fn find_profile(&self, id: Uuid) -> Result<Profile, AppError> {
        self.profiles.find_profile(id).await?.ok_or(AppError::ProfileNotFound)
    }
}
