use crate::config::{AuthConfig, Config, MonitorType};

/// Prepends `http://` when no scheme is given and drops trailing slashes.
pub fn normalize_base_url(url: &str) -> String {
    let url = url.trim();
    let url = if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("http://{url}")
    };
    url.trim_end_matches('/').to_string()
}

const ZABBIX_URL: &str = "ZABBIX_URL";

pub fn get_zabbix_url() -> Option<String> {
    non_empty_env(ZABBIX_URL)
}

const ZABBIX_USER: &str = "ZABBIX_USER";

pub fn get_zabbix_user() -> Option<String> {
    non_empty_env(ZABBIX_USER)
}

const ZABBIX_PASSWORD: &str = "ZABBIX_PASSWORD";

pub fn get_zabbix_password() -> Option<String> {
    non_empty_env(ZABBIX_PASSWORD)
}

const ZABBIX_TOKEN: &str = "ZABBIX_TOKEN";

pub fn get_zabbix_token() -> Option<String> {
    non_empty_env(ZABBIX_TOKEN)
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

/// Zabbix connection assembled from `ZABBIX_*` environment variables.
pub fn zabbix_config_from_env() -> Option<Config> {
    let url = get_zabbix_url()?;
    let auth = AuthConfig {
        url,
        username: get_zabbix_user(),
        password: get_zabbix_password(),
        token: get_zabbix_token(),
    };
    Some(Config::new("zabbix", MonitorType::Zabbix, auth))
}
