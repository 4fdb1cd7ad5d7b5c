//! CLI commands

use anyhow::{Context, Result, bail};
use clap::{Subcommand, ValueEnum};
use quicksurf_http::client::{ApiRequest, ClientError, QuicksurfClient};
use quicksurf_http::types::{AirtimePurchase, DataPurchase, Network, RegisterRequest};
use reqwest::Method;
use rust_decimal::Decimal;
use serde_json::{Value, json};
use tracing::info;

#[derive(Subcommand)]
pub enum Commands {
    /// Log in and remember the session
    Login {
        #[arg(long)]
        email: String,

        #[arg(long, env = "QUICKSURF_PASSWORD", hide_env_values = true)]
        password: String,

        /// Keep credentials for this process only
        #[arg(long)]
        no_remember: bool,
    },

    /// Create an account
    Register {
        #[arg(long)]
        email: String,

        #[arg(long, env = "QUICKSURF_PASSWORD", hide_env_values = true)]
        password: String,

        /// Password confirmation (defaults to the password)
        #[arg(long)]
        confirm: Option<String>,

        #[arg(long)]
        first_name: String,

        #[arg(long)]
        last_name: String,
    },

    /// Forget stored credentials
    Logout,

    /// Show the logged-in user
    Whoami,

    /// Show the wallet balance
    Wallet,

    /// List recent purchases
    History {
        #[arg(value_enum)]
        kind: PurchaseKind,

        #[arg(long, default_value = "10")]
        page_size: u32,
    },

    /// Buy airtime or data
    Buy {
        #[command(subcommand)]
        command: BuyCommands,
    },

    /// Exchange the refresh token for a new access token
    Refresh,

    /// Send an arbitrary authenticated request and print the response
    Request {
        /// HTTP method
        method: String,

        /// Path below the API root, or an absolute URL
        target: String,

        /// JSON request body
        #[arg(long)]
        body: Option<String>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum PurchaseKind {
    Airtime,
    Data,
}

#[derive(Subcommand)]
pub enum BuyCommands {
    /// Top up airtime
    Airtime {
        #[arg(long)]
        network: Network,

        #[arg(long)]
        phone: String,

        #[arg(long)]
        amount: Decimal,
    },

    /// Buy a data bundle
    Data {
        #[arg(long)]
        network: Network,

        #[arg(long)]
        phone: String,

        #[arg(long)]
        amount: Decimal,

        /// Plan code, e.g. 1GB
        #[arg(long)]
        plan: String,
    },
}

impl Commands {
    pub async fn execute(self, client: &QuicksurfClient) -> Result<()> {
        match self {
            Self::Login {
                email,
                password,
                no_remember,
            } => {
                client
                    .login(&email, &password, !no_remember)
                    .await
                    .map_err(|e| describe(e, "Invalid credentials"))?;
                info!(email = %email, "Login successful");
                print_json(&json!({ "logged_in": true, "remembered": !no_remember }))
            }

            Self::Register {
                email,
                password,
                confirm,
                first_name,
                last_name,
            } => {
                let confirm = confirm.unwrap_or_else(|| password.clone());
                let request =
                    RegisterRequest::new(email, password, confirm, first_name, last_name);
                let tokens = client
                    .register(&request)
                    .await
                    .map_err(|e| describe(e, "Registration failed"))?;
                print_json(&json!({ "registered": true, "logged_in": tokens.is_some() }))
            }

            Self::Logout => {
                client.logout();
                print_json(&json!({ "logged_in": false }))
            }

            Self::Whoami => {
                require_login(client)?;
                let me = client.me().await.map_err(session_error)?;
                print_json(&me)
            }

            Self::Wallet => {
                require_login(client)?;
                let wallet = client.wallet().await.map_err(session_error)?;
                print_json(&wallet)
            }

            Self::History { kind, page_size } => {
                require_login(client)?;
                match kind {
                    PurchaseKind::Airtime => {
                        print_json(&client.airtime_history(page_size).await.map_err(session_error)?)
                    }
                    PurchaseKind::Data => {
                        print_json(&client.data_history(page_size).await.map_err(session_error)?)
                    }
                }
            }

            Self::Buy { command } => {
                require_login(client)?;
                let ack = match command {
                    BuyCommands::Airtime {
                        network,
                        phone,
                        amount,
                    } => {
                        let order = AirtimePurchase::new(network, &phone, amount);
                        client.buy_airtime(&order).await
                    }
                    BuyCommands::Data {
                        network,
                        phone,
                        amount,
                        plan,
                    } => {
                        let order = DataPurchase::new(network, &phone, amount, plan);
                        client.buy_data(&order).await
                    }
                }
                .map_err(session_error)?;
                print_json(&ack)
            }

            Self::Refresh => {
                client
                    .refresh()
                    .await
                    .context("Could not refresh the session; log in again")?;
                print_json(&json!({ "refreshed": true }))
            }

            Self::Request {
                method,
                target,
                body,
            } => {
                let request = build_request(&method, target, body.as_deref())?;
                let response = client.request(request).await?;
                let status = response.status();
                let text = response.text().await?;

                eprintln!("{status}");
                match serde_json::from_str::<Value>(&text) {
                    Ok(value) => print_json(&value)?,
                    Err(_) if !text.is_empty() => println!("{text}"),
                    Err(_) => {}
                }

                if !status.is_success() {
                    bail!("request failed with {status}");
                }
                Ok(())
            }
        }
    }
}

fn build_request(method: &str, target: String, body: Option<&str>) -> Result<ApiRequest> {
    let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
        .with_context(|| format!("invalid HTTP method '{method}'"))?;

    let request = ApiRequest::new(method, target);
    match body {
        Some(body) => {
            let value: Value = serde_json::from_str(body).context("--body must be valid JSON")?;
            Ok(request.json(&value)?)
        }
        None => Ok(request),
    }
}

fn require_login(client: &QuicksurfClient) -> Result<()> {
    if !client.is_authenticated() {
        bail!("Not logged in. Run `quicksurf login` first.");
    }
    Ok(())
}

fn session_error(err: ClientError) -> anyhow::Error {
    if err.is_unauthorized() {
        anyhow::anyhow!("Session expired. Run `quicksurf login` again.")
    } else {
        err.into()
    }
}

/// Prefer the server's `detail`/`error` message over the raw status
fn describe(err: ClientError, fallback: &str) -> anyhow::Error {
    if let ClientError::Status { body, .. } = &err {
        let detail = serde_json::from_str::<Value>(body).ok().and_then(|v| {
            v.get("detail")
                .or_else(|| v.get("error"))
                .and_then(Value::as_str)
                .map(str::to_string)
        });
        return anyhow::anyhow!(detail.unwrap_or_else(|| fallback.to_string()));
    }
    err.into()
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn request_method_is_case_insensitive() {
        let request = build_request("post", "/echo/".into(), Some(r#"{"a":1}"#)).unwrap();
        assert_eq!(request.method, Method::POST);
        assert!(request.body.is_some());
    }

    #[test]
    fn request_body_must_be_json() {
        assert!(build_request("POST", "/echo/".into(), Some("{oops")).is_err());
    }

    #[test]
    fn server_detail_is_surfaced() {
        let err = ClientError::from_status(
            StatusCode::BAD_REQUEST,
            r#"{"detail":"Email already registered"}"#.into(),
        );
        assert_eq!(describe(err, "Registration failed").to_string(), "Email already registered");

        let err = ClientError::from_status(StatusCode::BAD_REQUEST, "<html>".into());
        assert_eq!(describe(err, "Registration failed").to_string(), "Registration failed");
    }

    #[test]
    fn expired_session_message() {
        let err = ClientError::from_status(StatusCode::UNAUTHORIZED, String::new());
        assert!(session_error(err).to_string().contains("login"));
    }
}
