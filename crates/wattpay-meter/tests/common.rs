//! Common test doubles for meter integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use wattpay_core::{Address, Confirmation, Milliwatts, SettlementPolicy, SettlementRequest};
use wattpay_meter::{Ledger, MeterLoop, PaymentFailure, PowerSource, SensorFault};

pub const ADDR: &str = "MICIKTVQFXDBZARARUUBXY9OBFDCOFBTYXGOWBWYFZIPYVZVPDLMBVKRF9EUSFASVECRT9PBVBMWMZWADPWZPDDLOD";

pub fn destination() -> Address {
    ADDR.parse().expect("valid test address")
}

/// One scripted sensor response.
#[derive(Debug, Clone, Copy)]
pub enum Step {
    Read(f64),
    Fault,
}

/// Replays a script of readings, then keeps returning `fallback`.
pub struct ScriptedSource {
    steps: VecDeque<Step>,
    fallback: Step,
}

impl ScriptedSource {
    pub fn new(steps: impl IntoIterator<Item = Step>) -> Self {
        Self {
            steps: steps.into_iter().collect(),
            fallback: Step::Read(0.0),
        }
    }

    pub fn constant(value: f64) -> Self {
        Self {
            steps: VecDeque::new(),
            fallback: Step::Read(value),
        }
    }
}

#[async_trait]
impl PowerSource for ScriptedSource {
    async fn read(&mut self) -> Result<Milliwatts, SensorFault> {
        match self.steps.pop_front().unwrap_or(self.fallback) {
            Step::Read(value) => Ok(Milliwatts::new(value).expect("valid scripted reading")),
            Step::Fault => Err(SensorFault::Unavailable("current out of device range".into())),
        }
    }
}

/// Records every settlement it is asked to pay.
///
/// Calls listed in `fail_calls` (0-based) fail; all others confirm.
#[derive(Clone, Default)]
pub struct RecordingLedger {
    pub requests: Arc<Mutex<Vec<SettlementRequest>>>,
    pub fail_calls: Vec<usize>,
}

impl RecordingLedger {
    pub fn failing_on(fail_calls: Vec<usize>) -> Self {
        Self {
            fail_calls,
            ..Self::default()
        }
    }

    pub fn amounts(&self) -> Vec<u64> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.amount)
            .collect()
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl Ledger for RecordingLedger {
    async fn pay(&self, request: &SettlementRequest) -> Result<Confirmation, PaymentFailure> {
        let call = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request.clone());
            requests.len() - 1
        };
        if self.fail_calls.contains(&call) {
            Err(PaymentFailure::Rejected("transfer not attached".into()))
        } else {
            Ok(Confirmation::new(format!("BUNDLE{call}")))
        }
    }
}

pub fn meter<S: PowerSource, L: Ledger>(
    source: S,
    ledger: L,
    window_size: u32,
    price_per_mw: f64,
) -> MeterLoop<S, L> {
    MeterLoop::new(
        source,
        ledger,
        SettlementPolicy::new(window_size, price_per_mw).expect("valid policy"),
        destination(),
        Duration::from_secs(1),
    )
    .expect("valid meter")
}
