//! Property-based tests for the registry (spec §8, invariant #1): for any
//! interleaving of `register`/`unregister` across a fixed pool of fake
//! clients, every live client's own view of `getRegisteredClients` equals
//! the registry's live set minus itself.

use std::collections::HashSet;

use proptest::prelude::*;
use proptest::test_runner::TestCaseError;

use samp_hub::{Hub, RegisterOutcome};
use samp_protocol::HubConfig;

const SLOTS: usize = 6;

#[derive(Debug, Clone, Copy)]
enum Op {
    Register(usize),
    Unregister(usize),
}

fn ops_strategy() -> impl Strategy<Value = Vec<Op>> {
    prop::collection::vec((0..SLOTS, prop::bool::ANY), 1..40).prop_map(|raw| {
        raw.into_iter()
            .map(|(slot, register)| if register { Op::Register(slot) } else { Op::Unregister(slot) })
            .collect()
    })
}

async fn run_ops(ops: Vec<Op>) -> Result<(), TestCaseError> {
    let hub = Hub::new(HubConfig::new());
    let mut slots: Vec<Option<RegisterOutcome>> = vec![None; SLOTS];

    for op in ops {
        match op {
            Op::Register(slot) => {
                if slots[slot].is_none() {
                    slots[slot] = Some(hub.register().await.expect("under max_clients"));
                }
            }
            Op::Unregister(slot) => {
                if let Some(outcome) = slots[slot].take() {
                    hub.unregister(&outcome.private_key).await.expect("was registered");
                }
            }
        }
    }

    let live: HashSet<_> = slots.iter().flatten().map(|o| o.self_id.clone()).collect();
    prop_assert_eq!(live.len(), hub.client_count());

    for outcome in slots.iter().flatten() {
        let seen: HashSet<_> = hub
            .get_registered_clients(&outcome.private_key)
            .expect("caller is still registered")
            .into_iter()
            .collect();
        let expected: HashSet<_> = live.iter().filter(|id| **id != outcome.self_id).cloned().collect();
        prop_assert_eq!(seen, expected);
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn registered_clients_match_live_set(ops in ops_strategy()) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(run_ops(ops))?;
    }
}
