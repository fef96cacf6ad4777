use async_trait::async_trait;
use serde::Deserialize;

use super::{map_order_status, GatewayError, PaymentGateway, RegisterResult, StatusResult};
use crate::shared::config::GatewayConfig;

/// HTTP-клиент REST API эквайринга Сбербанка
///
/// Все запросы — form-encoded POST с учётными данными мерчанта,
/// таймаут 30 секунд. Клиент не ретраит сам: повтор — ответственность
/// вызывающего.
pub struct SberbankApiClient {
    client: reqwest::Client,
    config: GatewayConfig,
}

impl SberbankApiClient {
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .expect("Failed to create HTTP client"),
            config,
        }
    }

    async fn post_form(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<serde_json::Value, GatewayError> {
        let url = format!("{}/{}", self.config.base_url.trim_end_matches('/'), endpoint);

        let response = self.client.post(&url).form(params).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!("Gateway request {} failed with status {}: {}", endpoint, status, body);
            return Err(GatewayError::Transport(format!(
                "{} returned HTTP {}",
                endpoint, status
            )));
        }

        let body = response.text().await?;
        match serde_json::from_str::<serde_json::Value>(&body) {
            Ok(json) => Ok(json),
            Err(e) => {
                let preview: String = body.chars().take(500).collect();
                tracing::error!("Failed to parse gateway response from {}: {}", endpoint, e);
                Err(GatewayError::Transport(format!(
                    "unparseable response from {}: {}",
                    endpoint, preview
                )))
            }
        }
    }
}

#[async_trait]
impl PaymentGateway for SberbankApiClient {
    /// Зарегистрировать заказ через POST /register.do
    async fn register(
        &self,
        order_number: &str,
        amount: i64,
        description: &str,
    ) -> Result<RegisterResult, GatewayError> {
        let amount_str = amount.to_string();
        let params = [
            ("userName", self.config.user_name.as_str()),
            ("password", self.config.password.as_str()),
            ("orderNumber", order_number),
            ("amount", amount_str.as_str()),
            ("currency", self.config.currency.as_str()),
            ("description", description),
            ("returnUrl", self.config.return_url.as_str()),
            ("failUrl", self.config.fail_url.as_str()),
        ];

        let json = self.post_form("register.do", &params).await?;
        let parsed: RegisterResponse = serde_json::from_value(json)
            .map_err(|e| GatewayError::Transport(format!("bad register.do payload: {}", e)))?;

        if let Some(code) = parsed.error_code.filter(|c| *c != 0) {
            return Err(GatewayError::Rejected {
                code,
                message: parsed.error_message.unwrap_or_default(),
            });
        }

        match (parsed.order_id, parsed.form_url) {
            (Some(order_id), Some(form_url)) => Ok(RegisterResult {
                gateway_order_id: order_id,
                redirect_url: form_url,
            }),
            _ => Err(GatewayError::Transport(
                "register.do returned neither error nor orderId/formUrl".into(),
            )),
        }
    }

    /// Запросить статус через POST /getOrderStatusExtended.do
    async fn query_status(&self, gateway_order_id: &str) -> Result<StatusResult, GatewayError> {
        let params = [
            ("userName", self.config.user_name.as_str()),
            ("password", self.config.password.as_str()),
            ("orderId", gateway_order_id),
        ];

        let raw = self.post_form("getOrderStatusExtended.do", &params).await?;

        if let Some(code) = parse_code(raw.get("errorCode")).filter(|c| *c != 0) {
            let message = raw
                .get("errorMessage")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();
            return Err(GatewayError::Rejected { code, message });
        }

        let gateway_code = parse_code(raw.get("orderStatus")).ok_or_else(|| {
            GatewayError::Transport("getOrderStatusExtended.do returned no orderStatus".into())
        })?;

        let payment_method = raw
            .get("paymentAmountInfo")
            .and_then(|v| v.get("paymentState"))
            .and_then(|v| v.as_str())
            .map(|_| "card".to_string())
            .or_else(|| {
                raw.get("cardAuthInfo")
                    .filter(|v| !v.is_null())
                    .map(|_| "card".to_string())
            });

        Ok(StatusResult {
            status: map_order_status(gateway_code),
            gateway_code,
            payment_method,
            raw,
        })
    }

    /// Возврат средств через POST /refund.do
    async fn refund(&self, gateway_order_id: &str, amount: i64) -> Result<(), GatewayError> {
        let amount_str = amount.to_string();
        let params = [
            ("userName", self.config.user_name.as_str()),
            ("password", self.config.password.as_str()),
            ("orderId", gateway_order_id),
            ("amount", amount_str.as_str()),
        ];

        let raw = self.post_form("refund.do", &params).await?;

        if let Some(code) = parse_code(raw.get("errorCode")).filter(|c| *c != 0) {
            let message = raw
                .get("errorMessage")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();
            return Err(GatewayError::Rejected { code, message });
        }

        Ok(())
    }
}

/// Числовой код из ответа шлюза: приходит то числом, то строкой
fn parse_code(value: Option<&serde_json::Value>) -> Option<i64> {
    match value? {
        serde_json::Value::Number(n) => n.as_i64(),
        serde_json::Value::String(s) => s.parse::<i64>().ok(),
        _ => None,
    }
}

#[derive(Debug, Clone, Deserialize)]
struct RegisterResponse {
    #[serde(rename = "orderId")]
    order_id: Option<String>,
    #[serde(rename = "formUrl")]
    form_url: Option<String>,
    #[serde(rename = "errorCode", default, deserialize_with = "deserialize_code_option")]
    error_code: Option<i64>,
    #[serde(rename = "errorMessage")]
    error_message: Option<String>,
}

/// Десериализует код ошибки из строки или числа в Option<i64>
fn deserialize_code_option<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::{self, Deserialize};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrInt {
        String(String),
        Int(i64),
    }

    match Option::<StringOrInt>::deserialize(deserializer)? {
        Some(StringOrInt::String(s)) => s.parse::<i64>().map(Some).map_err(de::Error::custom),
        Some(StringOrInt::Int(n)) => Ok(Some(n)),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_code_accepts_string_and_number() {
        assert_eq!(parse_code(Some(&serde_json::json!(2))), Some(2));
        assert_eq!(parse_code(Some(&serde_json::json!("6"))), Some(6));
        assert_eq!(parse_code(Some(&serde_json::json!(null))), None);
        assert_eq!(parse_code(None), None);
    }

    #[test]
    fn test_register_response_with_string_error_code() {
        let parsed: RegisterResponse = serde_json::from_str(
            r#"{"errorCode":"5","errorMessage":"Доступ запрещён"}"#,
        )
        .unwrap();
        assert_eq!(parsed.error_code, Some(5));
        assert_eq!(parsed.error_message.as_deref(), Some("Доступ запрещён"));
    }

    #[test]
    fn test_register_response_success_shape() {
        let parsed: RegisterResponse = serde_json::from_str(
            r#"{"orderId":"70906e55-7114-41d6","formUrl":"https://3dsec.sberbank.ru/payment/merchants/test/payment_ru.html?mdOrder=70906e55"}"#,
        )
        .unwrap();
        assert_eq!(parsed.error_code, None);
        assert!(parsed.order_id.is_some());
        assert!(parsed.form_url.is_some());
    }
}
