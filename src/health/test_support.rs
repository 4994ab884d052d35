//! Scripted pool owner for health tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::error::NodeError;
use crate::load_balancer::pool::PoolOwner;

#[derive(Debug, Clone, Copy)]
pub(crate) enum Behaviour {
    Respond,
    Delay(Duration),
    Refuse,
    Hang,
    Panic,
    Reject,
}

#[derive(Default)]
pub(crate) struct ScriptedOwner {
    behaviour: DashMap<&'static str, Behaviour>,
    working: Mutex<Vec<&'static str>>,
    failed: Mutex<Vec<&'static str>>,
    pub probes: AtomicUsize,
    pub sweeps: AtomicUsize,
    pub completed: AtomicUsize,
    pub in_flight: AtomicUsize,
    pub peak_in_flight: AtomicUsize,
    pub panic_next_sweep: AtomicBool,
    pub panic_next_callback: AtomicBool,
}

struct InFlight<'a>(&'a ScriptedOwner);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ScriptedOwner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, node: &'static str, behaviour: Behaviour) {
        self.behaviour.insert(node, behaviour);
    }

    pub fn working_calls(&self) -> Vec<&'static str> {
        self.working.lock().unwrap().clone()
    }

    pub fn failed_calls(&self) -> Vec<&'static str> {
        self.failed.lock().unwrap().clone()
    }

    fn maybe_panic(&self) {
        if self.panic_next_callback.swap(false, Ordering::SeqCst) {
            panic!("owner callback exploded");
        }
    }
}

#[async_trait]
impl PoolOwner<&'static str> for ScriptedOwner {
    fn working(&self, node: &&'static str) {
        self.maybe_panic();
        self.working.lock().unwrap().push(*node);
    }

    fn failed(&self, node: &&'static str) {
        self.maybe_panic();
        self.failed.lock().unwrap().push(*node);
    }

    async fn probe(&self, node: &&'static str, _request_timeout: Duration) -> Result<(), NodeError> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        let _in_flight = InFlight(self);

        let behaviour = self
            .behaviour
            .get(node)
            .map(|b| *b)
            .unwrap_or(Behaviour::Respond);

        let outcome = match behaviour {
            Behaviour::Respond => Ok(()),
            Behaviour::Delay(delay) => {
                tokio::time::sleep(delay).await;
                Ok(())
            }
            Behaviour::Refuse => Err(NodeError::Communication("connection refused".into())),
            Behaviour::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(())
            }
            Behaviour::Panic => panic!("probe exploded"),
            Behaviour::Reject => Err(NodeError::Application("overloaded".into())),
        };
        self.completed.fetch_add(1, Ordering::SeqCst);
        outcome
    }

    fn sweep_completed(&self) {
        self.sweeps.fetch_add(1, Ordering::SeqCst);
        if self.panic_next_sweep.swap(false, Ordering::SeqCst) {
            panic!("sweep hook exploded");
        }
    }
}
