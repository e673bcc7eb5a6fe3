//! Property-based fuzzing suite for the pool
//!
//! Increase cases: PROPTEST_CASES=1000 cargo test --test fuzzing
//!
//! This suite implements:
//! - Snapshot-based "no mutation on error" checking
//! - Global invariants (claims conservation, asset conservation, reserve coverage)
//! - Action-based state machine fuzzer, including finite and revoked
//!   authorizations so failed operations exercise the transfer unwind
//! - Focused property tests for minting, withdrawal and swap pricing

use cpamm_math::U256;
use cpamm_pool::*;
use proptest::prelude::*;

// ============================================================================
// FIXTURES
// ============================================================================

const UNIT: u128 = SCALE;
const MAX_AMOUNT: u128 = 1_000_000_000 * UNIT;
const FUNDING: u128 = 1_000_000_000_000 * UNIT;
const ACCOUNTS: usize = 3;

fn asset_a() -> AssetId {
    AssetId::new("A")
}

fn asset_b() -> AssetId {
    AssetId::new("B")
}

fn account(index: usize) -> AccountId {
    AccountId::new(format!("acct-{}", index))
}

fn funded_pool() -> Pool<InMemoryLedger> {
    let mut ledger = InMemoryLedger::new();
    for index in 0..ACCOUNTS {
        for asset in [asset_a(), asset_b()] {
            ledger.credit(&asset, &account(index), FUNDING).unwrap();
            ledger.approve(&asset, &account(index), u128::MAX);
        }
    }
    Pool::new(asset_a(), asset_b(), ledger).unwrap()
}

fn product(reserves: (u128, u128)) -> U256 {
    U256::from(reserves.0) * U256::from(reserves.1)
}

fn bps_of(value: u128, bps: u16) -> u128 {
    (U256::from(value) * U256::from(bps) / U256::from(10_000u32)).low_u128()
}

// ============================================================================
// GLOBAL INVARIANTS
// ============================================================================

/// Every unit of each asset is either held by an account or by the pool
fn assets_conserved(pool: &Pool<InMemoryLedger>) -> bool {
    let ledger = pool.ledger();
    [asset_a(), asset_b()].iter().all(|asset| {
        let held: u128 = (0..ACCOUNTS)
            .map(|index| ledger.balance_of(asset, &account(index)))
            .sum();
        held + ledger.pool_balance(asset) == FUNDING * ACCOUNTS as u128
    })
}

fn assert_invariants(pool: &Pool<InMemoryLedger>) {
    assert!(pool.check_conservation(), "claims/reserve conservation broken");
    assert!(assets_conserved(pool), "asset conservation broken");

    let held: u128 = pool.claims().iter().map(|(_, balance)| balance).sum();
    assert_eq!(held, pool.total_claims());

    // The in-memory ledger only moves what the pool books, so coverage is exact
    let (ra, rb) = pool.reserves();
    assert_eq!(pool.ledger().pool_balance(&asset_a()), ra);
    assert_eq!(pool.ledger().pool_balance(&asset_b()), rb);
}

// ============================================================================
// ACTION-BASED STATE MACHINE
// ============================================================================

#[derive(Clone, Debug)]
enum Action {
    Add { who: usize, amount_a: u128, amount_b: u128 },
    Remove { who: usize, bps: u16 },
    Swap { who: usize, amount_in: u128, direction: Direction },
    Transfer { from: usize, to: usize, bps: u16 },
    Approve { who: usize, asset_b: bool, allowance: u128 },
}

fn amount() -> impl Strategy<Value = u128> {
    prop_oneof![1u128..1_000u128, UNIT..=1_000 * UNIT, 1u128..=MAX_AMOUNT]
}

/// Zero, finite or unlimited pool authorization
fn allowance() -> impl Strategy<Value = u128> {
    prop_oneof![Just(0u128), amount(), Just(u128::MAX)]
}

fn direction() -> impl Strategy<Value = Direction> {
    prop_oneof![Just(Direction::AToB), Just(Direction::BToA)]
}

fn action() -> impl Strategy<Value = Action> {
    prop_oneof![
        (0..ACCOUNTS, amount(), amount())
            .prop_map(|(who, amount_a, amount_b)| Action::Add { who, amount_a, amount_b }),
        (0..ACCOUNTS, 0u16..=10_000).prop_map(|(who, bps)| Action::Remove { who, bps }),
        (0..ACCOUNTS, amount(), direction())
            .prop_map(|(who, amount_in, direction)| Action::Swap { who, amount_in, direction }),
        (0..ACCOUNTS, 0..ACCOUNTS, 0u16..=10_000)
            .prop_map(|(from, to, bps)| Action::Transfer { from, to, bps }),
        (0..ACCOUNTS, any::<bool>(), allowance())
            .prop_map(|(who, asset_b, allowance)| Action::Approve { who, asset_b, allowance }),
    ]
}

fn apply(pool: &mut Pool<InMemoryLedger>, action: &Action) -> Result<()> {
    match action {
        Action::Add { who, amount_a, amount_b } => {
            pool.add_liquidity(*amount_a, *amount_b, &account(*who)).map(|_| ())
        }
        Action::Remove { who, bps } => {
            let claims = bps_of(pool.claims_of(&account(*who)), *bps);
            pool.remove_liquidity(claims, &account(*who)).map(|_| ())
        }
        Action::Swap { who, amount_in, direction } => {
            let before = product(pool.reserves());
            let out = pool.swap(*amount_in, *direction, &account(*who))?;
            assert!(product(pool.reserves()) >= before, "swap decreased k (out={})", out);
            Ok(())
        }
        Action::Transfer { from, to, bps } => {
            let amount = bps_of(pool.claims_of(&account(*from)), *bps);
            pool.transfer_claims(&account(*from), &account(*to), amount)
        }
        Action::Approve { who, asset_b: use_b, allowance } => {
            let asset = if *use_b { asset_b() } else { asset_a() };
            pool.ledger_mut().approve(&asset, &account(*who), *allowance);
            Ok(())
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn fuzz_action_sequences(actions in prop::collection::vec(action(), 1..40)) {
        let mut pool = funded_pool();
        for action in &actions {
            let snapshot = pool.clone();
            if apply(&mut pool, action).is_err() {
                prop_assert_eq!(&pool, &snapshot, "failed {:?} mutated state", action);
            }
            assert_invariants(&pool);
        }
    }

    // ========================================================================
    // FOCUSED PROPERTIES
    // ========================================================================

    #[test]
    fn prop_first_deposit_claims_are_floored_sqrt(a in 1u128..=MAX_AMOUNT, b in 1u128..=MAX_AMOUNT) {
        let mut pool = funded_pool();
        let minted = pool.add_liquidity(a, b, &account(0)).unwrap();

        let target = U256::from(a) * U256::from(b) / U256::from(UNIT);
        let root = U256::from(minted);
        prop_assert!(root * root <= target);
        prop_assert!((root + U256::one()) * (root + U256::one()) > target);

        prop_assert_eq!(pool.reserves(), (a, b));
        prop_assert_eq!(pool.total_claims(), minted);
    }

    #[test]
    fn prop_later_deposit_mints_min_share(
        seed_a in UNIT..=MAX_AMOUNT,
        seed_b in UNIT..=MAX_AMOUNT,
        a in 1u128..=MAX_AMOUNT,
        b in 1u128..=MAX_AMOUNT,
    ) {
        let mut pool = funded_pool();
        pool.add_liquidity(seed_a, seed_b, &account(0)).unwrap();
        let total = U256::from(pool.total_claims());

        let minted = pool.add_liquidity(a, b, &account(1)).unwrap();

        let share_a = U256::from(a) * total / U256::from(seed_a);
        let share_b = U256::from(b) * total / U256::from(seed_b);
        prop_assert_eq!(U256::from(minted), share_a.min(share_b));
    }

    #[test]
    fn prop_proportional_deposit_keeps_price(
        seed_a in UNIT..=MAX_AMOUNT,
        seed_b in UNIT..=MAX_AMOUNT,
        multiple in 1u128..8,
    ) {
        let mut pool = funded_pool();
        pool.add_liquidity(seed_a, seed_b, &account(0)).unwrap();
        let price = pool.price().unwrap();

        pool.add_liquidity(seed_a * multiple, seed_b * multiple, &account(1)).unwrap();

        prop_assert_eq!(pool.price().unwrap(), price);
    }

    #[test]
    fn prop_sole_depositor_round_trip(a in 1u128..=MAX_AMOUNT, b in 1u128..=MAX_AMOUNT) {
        let mut pool = funded_pool();
        let minted = pool.add_liquidity(a, b, &account(0)).unwrap();
        prop_assume!(minted > 0);

        let (out_a, out_b) = pool.remove_liquidity(minted, &account(0)).unwrap();

        prop_assert!(out_a <= a);
        prop_assert!(out_b <= b);
        prop_assert_eq!(pool.total_claims(), 0);
        prop_assert_eq!(pool.reserves(), (a - out_a, b - out_b));
    }

    #[test]
    fn prop_swap_never_decreases_k(
        seed_a in UNIT..=MAX_AMOUNT,
        seed_b in UNIT..=MAX_AMOUNT,
        amount_in in amount(),
        direction in direction(),
    ) {
        let mut pool = funded_pool();
        pool.add_liquidity(seed_a, seed_b, &account(0)).unwrap();
        let before = pool.reserves();
        let quoted = pool.quote(amount_in, direction).unwrap();

        let out = pool.swap(amount_in, direction, &account(1)).unwrap();

        prop_assert_eq!(out, quoted);
        prop_assert!(product(pool.reserves()) >= product(before));
        assert_invariants(&pool);
    }

    #[test]
    fn prop_over_withdrawal_rejected(extra in 1u128..=MAX_AMOUNT, who in 0..ACCOUNTS) {
        let mut pool = funded_pool();
        pool.add_liquidity(10 * UNIT, 10 * UNIT, &account(0)).unwrap();
        let snapshot = pool.clone();
        let owned = pool.claims_of(&account(who));

        let result = pool.remove_liquidity(owned + extra, &account(who));

        prop_assert_eq!(result, Err(PoolError::InsufficientClaims));
        prop_assert_eq!(&pool, &snapshot);
    }
}

// ============================================================================
// DETERMINISTIC REGRESSIONS
// ============================================================================

#[test]
fn fuzz_deterministic_drain_after_swaps() {
    let mut pool = funded_pool();
    let first = pool.add_liquidity(500 * UNIT, 1_500 * UNIT, &account(0)).unwrap();
    let second = pool.add_liquidity(100 * UNIT, 300 * UNIT, &account(1)).unwrap();

    for round in 0..50u128 {
        let direction = if round % 3 == 0 { Direction::BToA } else { Direction::AToB };
        pool.swap(round * UNIT / 7 + 1, direction, &account(2)).unwrap();
        assert_invariants(&pool);
    }

    pool.remove_liquidity(first, &account(0)).unwrap();
    pool.remove_liquidity(second, &account(1)).unwrap();

    assert_eq!(pool.total_claims(), 0);
    assert_eq!(pool.reserves(), (0, 0));
    assert_invariants(&pool);
}
