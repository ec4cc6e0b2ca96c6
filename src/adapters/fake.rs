//! Scriptable gateway double for tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;

use super::traits::{GatewayOrder, GatewayOrderRequest, PaymentGateway};
use crate::error::GatewayError;

#[derive(Default)]
pub struct FakeGateway {
    orders: Mutex<HashMap<String, GatewayOrder>>,
    next_order_ids: Mutex<Vec<String>>,
    requests: Mutex<Vec<GatewayOrderRequest>>,
    fail_create: Mutex<bool>,
    fail_fetch: Mutex<bool>,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next created order gets this id instead of a generated one
    pub fn with_order_id(self, id: &str) -> Self {
        self.next_order_ids.lock().insert(0, id.to_string());
        self
    }

    pub fn insert_order(&self, order: GatewayOrder) {
        self.orders.lock().insert(order.id.clone(), order);
    }

    pub fn fail_create(&self) {
        *self.fail_create.lock() = true;
    }

    pub fn fail_fetch(&self) {
        *self.fail_fetch.lock() = true;
    }

    pub fn requests(&self) -> Vec<GatewayOrderRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    fn name(&self) -> &'static str {
        "fake"
    }

    fn public_key(&self) -> &str {
        "rzp_test_key"
    }

    async fn create_order(&self, request: &GatewayOrderRequest) -> Result<GatewayOrder, GatewayError> {
        if *self.fail_create.lock() {
            return Err(GatewayError::Unreachable("connection reset".to_string()));
        }
        self.requests.lock().push(request.clone());

        let id = self
            .next_order_ids
            .lock()
            .pop()
            .unwrap_or_else(|| format!("order_{}", self.orders.lock().len() + 1));

        let mut notes = HashMap::new();
        notes.insert("userId".to_string(), request.notes.user_id.clone());
        notes.insert("plan".to_string(), request.notes.plan.clone());

        let order = GatewayOrder {
            id,
            amount: request.amount,
            currency: request.currency.clone(),
            receipt: Some(request.receipt.clone()),
            status: "created".to_string(),
            notes,
        };
        self.insert_order(order.clone());
        Ok(order)
    }

    async fn fetch_order(&self, order_id: &str) -> Result<GatewayOrder, GatewayError> {
        if *self.fail_fetch.lock() {
            return Err(GatewayError::Timeout);
        }
        self.orders
            .lock()
            .get(order_id)
            .cloned()
            .ok_or_else(|| GatewayError::Rejected {
                status: 400,
                message: "BAD_REQUEST_ERROR: The id provided does not exist".to_string(),
            })
    }
}
