//! Configuração do sowatch carregada a partir de `sowatch.toml`.
//!
//! A struct [`WatchConfig`] agrupa a API de pedidos (`[holded]`), o envio de
//! e-mail (`[mail]`) e o caminho do mapa de estados. Valores ausentes usam
//! defaults sensíveis e as variáveis de ambiente têm precedência sobre o
//! arquivo.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{MailError, WatchError};
use crate::holded::HoldedClient;
use crate::holded::client::{API_URL, DEFAULT_PAGE_LIMIT};
use crate::notify::{Recipients, SmtpSettings};

/// Arquivo lido quando `--config` não é informado.
pub const DEFAULT_CONFIG_FILE: &str = "sowatch.toml";

/// Configuração de nível superior carregada de `sowatch.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    pub holded: HoldedConfig,
    pub mail: MailConfig,
    /// Caminho do mapa de estados persistido.
    pub state_file: StateFile,
}

/// Caminho do mapa de estados, com default `.state/salesorder_status.json`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct StateFile(pub PathBuf);

impl Default for StateFile {
    fn default() -> Self {
        Self(PathBuf::from(".state/salesorder_status.json"))
    }
}

/// Acesso à API de pedidos e produtos.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HoldedConfig {
    /// Chave da API.
    pub api_key: String,
    /// Envia a chave como `Authorization: Bearer` em vez do cabeçalho `key`.
    pub use_bearer: bool,
    pub base_url: String,
    /// Tamanho de página na listagem de pedidos.
    pub page_limit: usize,
    pub timeout_secs: u64,
}

impl Default for HoldedConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            use_bearer: false,
            base_url: API_URL.to_string(),
            page_limit: DEFAULT_PAGE_LIMIT,
            timeout_secs: 60,
        }
    }
}

/// Remetente, destinatários e servidor SMTP.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MailConfig {
    pub from: String,
    pub to: Vec<String>,
    /// Destinatários extras apenas para cancelamentos.
    pub cancel_to: Vec<String>,
    pub smtp_host: String,
    /// 587 usa STARTTLS; 465 usa TLS implícito.
    pub smtp_port: u16,
    pub smtp_user: String,
    pub smtp_pass: String,
    pub timeout_secs: u64,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            from: String::new(),
            to: Vec::new(),
            cancel_to: Vec::new(),
            smtp_host: String::new(),
            smtp_port: 587,
            smtp_user: String::new(),
            smtp_pass: String::new(),
            timeout_secs: 60,
        }
    }
}

// Divide listas separadas por vírgula, ignorando entradas vazias.
fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn is_truthy(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes")
}

impl WatchConfig {
    /// Carrega a configuração de `path` (ou de `sowatch.toml`) e aplica as
    /// variáveis de ambiente. Usa valores padrão se o arquivo não existir.
    pub fn load(path: Option<&Path>) -> Result<Self, WatchError> {
        let path = path.unwrap_or(Path::new(DEFAULT_CONFIG_FILE));
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            toml::from_str::<WatchConfig>(&contents)?
        } else {
            Self::default()
        };
        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Sobrescreve campos com variáveis de ambiente não vazias.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(key) = var("HOLDED_API_KEY") {
            self.holded.api_key = key;
        }
        if let Some(flag) = var("HOLDED_USE_BEARER") {
            self.holded.use_bearer = is_truthy(&flag);
        }
        if let Some(url) = var("HOLDED_BASE_URL") {
            self.holded.base_url = url;
        }
        if let Some(from) = var("MAIL_FROM") {
            self.mail.from = from;
        }
        if let Some(to) = var("MAIL_TO") {
            self.mail.to = split_list(&to);
        }
        if let Some(cancel_to) = var("MAIL_TO_CANCEL") {
            self.mail.cancel_to = split_list(&cancel_to);
        }
        if let Some(host) = var("SMTP_HOST") {
            self.mail.smtp_host = host;
        }
        // Porta inválida mantém o valor do arquivo.
        if let Some(port) = var("SMTP_PORT").and_then(|p| p.trim().parse().ok()) {
            self.mail.smtp_port = port;
        }
        if let Some(user) = var("SMTP_USER") {
            self.mail.smtp_user = user;
        }
        if let Some(pass) = var("SMTP_PASS") {
            self.mail.smtp_pass = pass;
        }
    }
}

impl HoldedConfig {
    /// Constrói o cliente da API. Falha se a chave não estiver configurada.
    pub fn client(&self) -> Result<HoldedClient, WatchError> {
        if self.api_key.trim().is_empty() {
            return Err(WatchError::Config(
                "missing HOLDED_API_KEY (env) or [holded].api_key".to_string(),
            ));
        }
        let client = HoldedClient::with_base_url(
            self.api_key.clone(),
            self.use_bearer,
            self.base_url.clone(),
            Duration::from_secs(self.timeout_secs),
        )?;
        Ok(client.with_page_limit(self.page_limit))
    }
}

impl MailConfig {
    pub fn recipients(&self) -> Recipients {
        Recipients {
            to: self.to.clone(),
            cancel_to: self.cancel_to.clone(),
        }
    }

    /// Parâmetros SMTP; só é chamado quando `--send-email` foi pedido.
    pub fn smtp_settings(&self) -> Result<SmtpSettings, MailError> {
        let required = [
            ("MAIL_FROM", &self.from),
            ("SMTP_HOST", &self.smtp_host),
            ("SMTP_USER", &self.smtp_user),
            ("SMTP_PASS", &self.smtp_pass),
        ];
        if let Some((name, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(MailError::MissingSetting(*name));
        }
        if self.to.is_empty() {
            return Err(MailError::MissingSetting("MAIL_TO"));
        }
        Ok(SmtpSettings {
            host: self.smtp_host.clone(),
            port: self.smtp_port,
            user: self.smtp_user.clone(),
            pass: self.smtp_pass.clone(),
            from: self.from.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn default_config_values() {
        let config = WatchConfig::default();
        assert_eq!(config.holded.base_url, API_URL);
        assert_eq!(config.holded.page_limit, 200);
        assert_eq!(config.holded.timeout_secs, 60);
        assert_eq!(config.mail.smtp_port, 587);
        assert_eq!(
            config.state_file.0,
            PathBuf::from(".state/salesorder_status.json")
        );
        assert!(config.holded.api_key.is_empty());
    }

    #[test]
    fn deserialize_partial_toml() {
        let toml_str = r#"
            state_file = "/var/lib/sowatch/state.json"

            [holded]
            api_key = "k-123"
            page_limit = 50

            [mail]
            to = ["ops@example.com"]
            smtp_port = 465
        "#;
        let config: WatchConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.holded.api_key, "k-123");
        assert_eq!(config.holded.page_limit, 50);
        assert!(!config.holded.use_bearer);
        assert_eq!(config.mail.to, vec!["ops@example.com"]);
        assert_eq!(config.mail.smtp_port, 465);
        assert_eq!(config.mail.timeout_secs, 60);
        assert_eq!(config.state_file.0, PathBuf::from("/var/lib/sowatch/state.json"));
    }

    #[test]
    fn env_overrides_file() {
        let mut config: WatchConfig = toml::from_str(
            r#"
            [holded]
            api_key = "from-file"
            [mail]
            smtp_port = 465
        "#,
        )
        .unwrap();
        config.apply_env(env(&[
            ("HOLDED_API_KEY", "from-env"),
            ("HOLDED_USE_BEARER", "Yes"),
            ("MAIL_TO", "a@x.com, b@x.com,,"),
            ("MAIL_TO_CANCEL", "c@x.com"),
            ("SMTP_PORT", "not-a-port"),
            ("SMTP_HOST", ""),
        ]));

        assert_eq!(config.holded.api_key, "from-env");
        assert!(config.holded.use_bearer);
        assert_eq!(config.mail.to, vec!["a@x.com", "b@x.com"]);
        assert_eq!(config.mail.cancel_to, vec!["c@x.com"]);
        assert_eq!(config.mail.smtp_port, 465);
        assert!(config.mail.smtp_host.is_empty());
    }

    #[test]
    fn load_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = WatchConfig::load(Some(&dir.path().join("absent.toml"))).unwrap();
        assert_eq!(config.holded.page_limit, 200);
    }

    #[test]
    fn load_reports_bad_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sowatch.toml");
        std::fs::write(&path, "[holded\napi_key = 1").unwrap();
        assert!(matches!(
            WatchConfig::load(Some(&path)),
            Err(WatchError::Toml(_))
        ));
    }

    #[test]
    fn client_requires_api_key() {
        let err = HoldedConfig::default().client().unwrap_err();
        assert!(matches!(err, WatchError::Config(_)));

        let config = HoldedConfig {
            api_key: "k".into(),
            ..Default::default()
        };
        assert!(config.client().is_ok());
    }

    #[test]
    fn smtp_settings_report_first_missing_value() {
        let mut mail = MailConfig {
            from: "reservas@example.com".into(),
            smtp_host: "smtp.example.com".into(),
            smtp_user: "user".into(),
            ..Default::default()
        };
        assert!(matches!(
            mail.smtp_settings(),
            Err(MailError::MissingSetting("SMTP_PASS"))
        ));

        mail.smtp_pass = "pass".into();
        assert!(matches!(
            mail.smtp_settings(),
            Err(MailError::MissingSetting("MAIL_TO"))
        ));

        mail.to = vec!["ops@example.com".into()];
        let settings = mail.smtp_settings().unwrap();
        assert_eq!(settings.port, 587);
        assert_eq!(settings.timeout, Duration::from_secs(60));
    }
}
