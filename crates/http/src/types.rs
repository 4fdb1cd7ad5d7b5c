//! Wire types exchanged with the Quicksurf backend

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value as JsonValue;
use std::fmt;

/// Access/refresh pair issued at login or registration
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPair").finish_non_exhaustive()
    }
}

/// Login request
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Registration request
///
/// The backend form expects the password twice more as `password1` and
/// `password2`.
#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub password1: String,
    pub password2: String,
    pub first_name: String,
    pub last_name: String,
}

impl RegisterRequest {
    pub fn new(
        email: impl Into<String>,
        password: impl Into<String>,
        confirm: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
    ) -> Self {
        let password = password.into();
        Self {
            email: email.into().trim().to_string(),
            password1: password.clone(),
            password,
            password2: confirm.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
        }
    }
}

/// Registration response; tokens are present when the backend logs the new
/// user straight in
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct RegisterResponse {
    #[serde(default)]
    pub access: Option<String>,
    #[serde(default)]
    pub refresh: Option<String>,
}

/// Refresh request body
#[derive(Serialize)]
pub(crate) struct RefreshRequest<'a> {
    pub refresh: &'a str,
}

/// Refresh response body
#[derive(Deserialize)]
pub(crate) struct RefreshResponse {
    #[serde(default)]
    pub access: Option<String>,
}

/// Logged-in user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub full_name: Option<String>,
}

/// Wallet balance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    pub balance: Decimal,
    #[serde(default)]
    pub last_updated: Option<String>,
}

impl Wallet {
    /// Normalise the shapes the wallet endpoints answer with
    ///
    /// Accepts a bare wallet object, a list of wallets, or a paginated
    /// `{results: [...]}` envelope, and takes the first wallet. The balance
    /// may sit at `balance` or `wallet.balance`, as a number or a decimal
    /// string.
    pub fn from_value(value: JsonValue) -> Option<Self> {
        let wallet = match value {
            JsonValue::Array(items) => items.into_iter().next()?,
            JsonValue::Object(mut map) => match map.remove("results") {
                Some(JsonValue::Array(items)) => items.into_iter().next()?,
                Some(other) => {
                    map.insert("results".into(), other);
                    JsonValue::Object(map)
                }
                None => JsonValue::Object(map),
            },
            _ => return None,
        };

        let object = wallet.as_object()?;
        let balance = object
            .get("balance")
            .or_else(|| object.get("wallet").and_then(|w| w.get("balance")))
            .and_then(|v| serde_json::from_value::<Decimal>(v.clone()).ok())
            .unwrap_or_default();
        let last_updated = ["updated", "updated_at", "last_updated"]
            .iter()
            .find_map(|key| object.get(*key).and_then(JsonValue::as_str))
            .map(str::to_string);

        Some(Self {
            balance,
            last_updated,
        })
    }
}

/// Page envelope used by list endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paginated<T> {
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
}

impl<T> Default for Paginated<T> {
    fn default() -> Self {
        Self {
            count: 0,
            next: None,
            previous: None,
            results: Vec::new(),
        }
    }
}

/// Mobile network operator
///
/// Parsed case-insensitively; always written in lowercase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Network {
    Mtn,
    Glo,
    Airtel,
    NineMobile,
}

impl Network {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mtn => "mtn",
            Self::Glo => "glo",
            Self::Airtel => "airtel",
            Self::NineMobile => "9mobile",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Network {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mtn" => Ok(Self::Mtn),
            "glo" => Ok(Self::Glo),
            "airtel" => Ok(Self::Airtel),
            "9mobile" | "etisalat" => Ok(Self::NineMobile),
            other => Err(format!("unknown network '{other}'")),
        }
    }
}

impl Serialize for Network {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Network {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Purchase status, collapsed from the provider's vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionStatus {
    Success,
    Pending,
    Failed,
}

impl TransactionStatus {
    pub fn from_provider(status: &str) -> Self {
        match status.trim().to_ascii_lowercase().as_str() {
            "successful" | "success" => Self::Success,
            "pending" | "initiated" => Self::Pending,
            _ => Self::Failed,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Pending => "pending",
            Self::Failed => "failed",
        }
    }
}

impl Serialize for TransactionStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for TransactionStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(Self::from_provider(raw.as_deref().unwrap_or_default()))
    }
}

/// Airtime purchase as listed by the history endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AirtimeTransaction {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub network: Network,
    pub phone: String,
    pub amount: Decimal,
    pub status: TransactionStatus,
    #[serde(default)]
    pub client_reference: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// Data bundle purchase as listed by the history endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataTransaction {
    #[serde(flatten)]
    pub purchase: AirtimeTransaction,
    pub plan: String,
}

/// Airtime top-up order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AirtimePurchase {
    pub network: Network,
    pub phone: String,
    pub amount: Decimal,
    pub client_reference: String,
}

impl AirtimePurchase {
    /// Build an order with a fresh idempotency reference
    ///
    /// Non-digit characters are stripped from the phone number.
    pub fn new(network: Network, phone: &str, amount: Decimal) -> Self {
        Self {
            network,
            phone: normalize_phone(phone),
            amount,
            client_reference: client_reference("airtime"),
        }
    }

    /// Check the phone number and amount before submitting
    ///
    /// # Errors
    ///
    /// Returns a human-readable reason when the order would be rejected
    pub fn validate(&self) -> Result<(), String> {
        validate_order(&self.phone, self.amount)
    }
}

/// Data bundle order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataPurchase {
    #[serde(flatten)]
    pub order: AirtimePurchase,
    pub plan: String,
}

impl DataPurchase {
    pub fn new(network: Network, phone: &str, amount: Decimal, plan: impl Into<String>) -> Self {
        Self {
            order: AirtimePurchase {
                client_reference: client_reference("data"),
                ..AirtimePurchase::new(network, phone, amount)
            },
            plan: plan.into(),
        }
    }

    /// # Errors
    ///
    /// Returns a human-readable reason when the order would be rejected
    pub fn validate(&self) -> Result<(), String> {
        if self.plan.trim().is_empty() {
            return Err("Please choose a data plan.".into());
        }
        self.order.validate()
    }
}

fn normalize_phone(phone: &str) -> String {
    phone.chars().filter(char::is_ascii_digit).collect()
}

fn validate_order(phone: &str, amount: Decimal) -> Result<(), String> {
    if !(10..=14).contains(&phone.len()) || !phone.chars().all(|c| c.is_ascii_digit()) {
        return Err("Please enter a valid phone number.".into());
    }
    if amount <= Decimal::ZERO {
        return Err("Please enter a valid amount.".into());
    }
    Ok(())
}

fn client_reference(kind: &str) -> String {
    format!("qs_{kind}_{}", uuid::Uuid::new_v4().simple())
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(i64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Number(n) => n.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::str::FromStr;

    #[test]
    fn wallet_shapes_are_normalised() {
        let bare = Wallet::from_value(json!({"balance": "1500.50", "updated_at": "2024-05-01"})).unwrap();
        assert_eq!(bare.balance, Decimal::from_str("1500.50").unwrap());
        assert_eq!(bare.last_updated.as_deref(), Some("2024-05-01"));

        let listed = Wallet::from_value(json!([{"balance": 20}, {"balance": 30}])).unwrap();
        assert_eq!(listed.balance, Decimal::from(20));

        let paged = Wallet::from_value(json!({"count": 1, "results": [{"wallet": {"balance": 7}}]})).unwrap();
        assert_eq!(paged.balance, Decimal::from(7));
        assert_eq!(paged.last_updated, None);

        assert_eq!(Wallet::from_value(json!([])), None);
        assert_eq!(Wallet::from_value(json!("nope")), None);
    }

    #[test]
    fn wallet_without_balance_reads_as_zero() {
        let wallet = Wallet::from_value(json!({"id": 3})).unwrap();
        assert_eq!(wallet.balance, Decimal::ZERO);
    }

    #[test]
    fn status_vocabulary_collapses() {
        assert_eq!(TransactionStatus::from_provider("SUCCESSFUL"), TransactionStatus::Success);
        assert_eq!(TransactionStatus::from_provider("initiated"), TransactionStatus::Pending);
        assert_eq!(TransactionStatus::from_provider("reversed"), TransactionStatus::Failed);
        assert_eq!(TransactionStatus::from_provider(""), TransactionStatus::Failed);
    }

    #[test]
    fn history_rows_accept_loose_types() {
        let page: Paginated<DataTransaction> = serde_json::from_value(json!({
            "count": 1,
            "next": null,
            "previous": null,
            "results": [{
                "id": 42,
                "network": "9mobile",
                "phone": "08031234567",
                "amount": "500.00",
                "status": "Pending",
                "client_reference": "qs_data_x",
                "timestamp": "2024-05-01T10:00:00Z",
                "plan": "1GB"
            }]
        }))
        .unwrap();

        let row = &page.results[0];
        assert_eq!(row.purchase.id, "42");
        assert_eq!(row.purchase.network, Network::NineMobile);
        assert_eq!(row.purchase.status, TransactionStatus::Pending);
        assert_eq!(row.purchase.amount, Decimal::from(500));
        assert_eq!(row.plan, "1GB");
    }

    #[test]
    fn purchases_normalise_and_validate() {
        let order = AirtimePurchase::new(Network::Mtn, "+234 803-123-4567", Decimal::from(100));
        assert_eq!(order.phone, "2348031234567");
        assert!(order.client_reference.starts_with("qs_airtime_"));
        assert!(order.validate().is_ok());

        let body = serde_json::to_value(&order).unwrap();
        assert_eq!(body["network"], "mtn");

        let short = AirtimePurchase::new(Network::Glo, "0803", Decimal::from(100));
        assert!(short.validate().is_err());

        let free = AirtimePurchase::new(Network::Glo, "08031234567", Decimal::ZERO);
        assert!(free.validate().is_err());
    }

    #[test]
    fn data_purchase_flattens_order() {
        let order = DataPurchase::new(Network::Airtel, "08031234567", Decimal::from(300), "1GB");
        assert!(order.order.client_reference.starts_with("qs_data_"));

        let body = serde_json::to_value(&order).unwrap();
        assert_eq!(body["plan"], "1GB");
        assert_eq!(body["phone"], "08031234567");
        assert_eq!(body["network"], "airtel");

        let no_plan = DataPurchase::new(Network::Airtel, "08031234567", Decimal::from(300), " ");
        assert!(no_plan.validate().is_err());
    }

    #[test]
    fn networks_deserialize_in_any_case() {
        let rows: Vec<Network> = serde_json::from_value(json!(["MTN", "Glo", "airtel", "9MOBILE"])).unwrap();
        assert_eq!(
            rows,
            vec![Network::Mtn, Network::Glo, Network::Airtel, Network::NineMobile]
        );
        assert_eq!(serde_json::to_value(Network::NineMobile).unwrap(), json!("9mobile"));
        assert!(serde_json::from_value::<Network>(json!("vodafone")).is_err());
    }

    #[test]
    fn networks_parse_from_cli_input() {
        assert_eq!(Network::from_str("MTN").unwrap(), Network::Mtn);
        assert_eq!(Network::from_str("9mobile").unwrap(), Network::NineMobile);
        assert!(Network::from_str("vodafone").is_err());
    }
}
