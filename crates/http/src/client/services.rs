//! Airtime and data purchase client methods

use super::{ApiRequest, ClientError, QuicksurfClient};
use crate::types::{
    AirtimePurchase, AirtimeTransaction, DataPurchase, DataTransaction, Paginated,
};
use serde_json::Value;

const AIRTIME_PATH: &str = "/services/airtime/";
const DATA_PATH: &str = "/services/data/";

impl QuicksurfClient {
    /// Recent airtime purchases, newest first
    pub async fn airtime_history(
        &self,
        page_size: u32,
    ) -> Result<Paginated<AirtimeTransaction>, ClientError> {
        let page = self
            .request_json(format!("{AIRTIME_PATH}?page_size={page_size}"))
            .await?;
        Ok(page.unwrap_or_default())
    }

    /// Recent data bundle purchases, newest first
    pub async fn data_history(
        &self,
        page_size: u32,
    ) -> Result<Paginated<DataTransaction>, ClientError> {
        let page = self
            .request_json(format!("{DATA_PATH}?page_size={page_size}"))
            .await?;
        Ok(page.unwrap_or_default())
    }

    /// Queue an airtime top-up
    ///
    /// The order is validated locally first. The backend's acknowledgement
    /// is returned as-is; its shape is not fixed.
    pub async fn buy_airtime(&self, purchase: &AirtimePurchase) -> Result<Value, ClientError> {
        purchase.validate().map_err(ClientError::InvalidInput)?;

        info!(
            network = %purchase.network,
            reference = %purchase.client_reference,
            "Submitting airtime purchase"
        );
        let request = ApiRequest::post(AIRTIME_PATH).json(purchase)?;
        Ok(self.request_json(request).await?.unwrap_or(Value::Null))
    }

    /// Queue a data bundle purchase
    pub async fn buy_data(&self, purchase: &DataPurchase) -> Result<Value, ClientError> {
        purchase.validate().map_err(ClientError::InvalidInput)?;

        info!(
            network = %purchase.order.network,
            plan = %purchase.plan,
            reference = %purchase.order.client_reference,
            "Submitting data purchase"
        );
        let request = ApiRequest::post(DATA_PATH).json(purchase)?;
        Ok(self.request_json(request).await?.unwrap_or(Value::Null))
    }
}
