//! Tipos de erro para o cliente da API de pedidos (Holded).
//!
//! Define [`HoldedError`] com variantes para documento inexistente, credenciais
//! rejeitadas, erros da API e erros de rede. Usa `thiserror` para derivar
//! `Display` e `Error` a partir dos atributos `#[error(...)]`.

use thiserror::Error;

/// Erros que podem ocorrer ao consultar pedidos e produtos.
///
/// - [`NotFound`](HoldedError::NotFound): nenhum dos endpoints conhece o id
/// - [`Unauthorized`](HoldedError::Unauthorized): HTTP 401/403, fatal para a execução
/// - [`ApiError`](HoldedError::ApiError): qualquer outro erro HTTP (4xx/5xx)
/// - [`Network`](HoldedError::Network): falha na camada de rede ou timeout
#[derive(Debug, Error)]
pub enum HoldedError {
    /// O pedido não existe nem no endpoint tipado nem no genérico.
    #[error("order not found: {0}")]
    NotFound(String),

    /// A chave da API foi rejeitada.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Erro retornado pela API com o código de status HTTP e o corpo da resposta.
    #[error("API error (status {status}): {message}")]
    ApiError { status: u16, message: String },

    /// Falha de rede subjacente (DNS, conexão recusada, timeout, corpo inválido).
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl HoldedError {
    /// Indica se o erro deve abortar a execução inteira.
    pub fn is_auth(&self) -> bool {
        matches!(self, HoldedError::Unauthorized(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_display() {
        let err = HoldedError::NotFound("65f0c1".into());
        assert_eq!(err.to_string(), "order not found: 65f0c1");
    }

    #[test]
    fn api_error_display() {
        let err = HoldedError::ApiError {
            status: 500,
            message: "Internal Server Error".into(),
        };
        assert_eq!(
            err.to_string(),
            "API error (status 500): Internal Server Error"
        );
    }

    #[test]
    fn only_unauthorized_is_auth() {
        assert!(HoldedError::Unauthorized("bad key".into()).is_auth());
        assert!(!HoldedError::NotFound("x".into()).is_auth());
    }
}
