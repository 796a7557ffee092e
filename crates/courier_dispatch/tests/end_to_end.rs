use courier_dispatch::{
    engine::DispatchEngine,
    orchestrator::unit::UnitStatus,
    params::{ClusterBand, DispatchParams, SearchParams},
    problem::{order::Order, route_candidate::RouteCandidate},
    providers::{
        depth_policy::SubsetBudgetPolicy,
        stores::{InMemoryCourierStore, InMemoryOrderStore},
    },
};
use fxhash::FxHashSet;

mod setup;

fn assert_feasible(candidate: &RouteCandidate, orders: &[Order], max_stops: usize, max_weight: f64) {
    assert!(!candidate.is_empty());
    assert!(candidate.len() <= max_stops);
    assert!(candidate.total_weight() <= max_weight);

    let departure = candidate.delivery_interval().start();
    for stop in candidate.stops() {
        let arrival = departure.checked_add(stop.arrival_offset).unwrap();
        assert!(
            setup::order_window(orders, stop.order_id.get()).contains(arrival),
            "order {} reached at {arrival} outside its window",
            stop.order_id
        );
    }
}

fn run(
    params: DispatchParams,
    policy: &SubsetBudgetPolicy,
    orders: &[Order],
    couriers: InMemoryCourierStore,
) -> Vec<RouteCandidate> {
    let order_store = orders.iter().cloned().collect::<InMemoryOrderStore>();
    let geo = setup::crow_flies_provider();

    let engine = DispatchEngine::new(params, &order_store, &couriers, &geo, policy).unwrap();
    let report = engine.dispatch(&[setup::shop()], setup::as_of()).unwrap();

    assert_eq!(report.units().len(), 1);
    assert!(matches!(report.units()[0].status(), UnitStatus::Done));

    report.into_units().remove(0).candidates().to_vec()
}

#[test]
fn test_three_orders_full_search() {
    let orders = setup::create_order_grid(3, 1);
    let couriers = [setup::create_courier(3, |_| {})].into_iter().collect();

    let candidates = run(
        DispatchParams::default(),
        &SubsetBudgetPolicy::default(),
        &orders,
        couriers,
    );

    // {1}, {2}, {3}, {1,2}, {1,3}, {2,3}, {1,2,3}
    assert_eq!(candidates.len(), 7);
    for candidate in &candidates {
        assert_feasible(candidate, &orders, 3, f64::INFINITY);
    }

    let keys = candidates
        .iter()
        .map(RouteCandidate::canonical_key)
        .collect::<FxHashSet<_>>();
    assert_eq!(keys.len(), 7);
}

#[test]
fn test_heavy_order_is_never_routed() {
    let mut orders = setup::create_order_grid(3, 1);
    orders.push(setup::create_order(4, 12.0, (4.356, 50.849)));
    let couriers = [setup::create_courier(2, |builder| {
        builder.set_max_order_weight(10.0);
    })]
    .into_iter()
    .collect();

    let candidates = run(
        DispatchParams::default(),
        &SubsetBudgetPolicy::default(),
        &orders,
        couriers,
    );

    assert!(!candidates.is_empty());
    assert!(
        candidates
            .iter()
            .all(|candidate| candidate.order_ids().all(|id| id.get() != 4))
    );
}

#[test]
fn test_clustered_dispatch_covers_every_order() {
    let orders = setup::create_order_grid(6, 5);
    let couriers = [setup::create_courier(5, |builder| {
        builder.set_max_weight(4.0);
    })]
    .into_iter()
    .collect();

    let mut params = DispatchParams::default();
    params.cloud.radius = 1_000.0;
    params.cloud.bands.five = ClusterBand {
        start_level: 3,
        start_order_count: 12,
    };
    // Too small for a full search over 30 orders at depth 5
    let policy = SubsetBudgetPolicy::new(20_000);

    let candidates = run(params, &policy, &orders, couriers);

    for candidate in &candidates {
        assert_feasible(candidate, &orders, 5, 4.0);
    }

    let covered = candidates
        .iter()
        .flat_map(RouteCandidate::order_ids)
        .collect::<FxHashSet<_>>();
    assert_eq!(covered.len(), orders.len());

    let keys = candidates
        .iter()
        .map(RouteCandidate::canonical_key)
        .collect::<FxHashSet<_>>();
    assert_eq!(keys.len(), candidates.len());

    // Weight caps routes at four orders
    assert!(candidates.iter().any(|candidate| candidate.len() == 4));
    assert!(candidates.iter().all(|candidate| candidate.len() <= 4));
}

#[test]
fn test_search_plans_agree() {
    let orders = setup::create_order_grid(4, 2);
    let policy = SubsetBudgetPolicy::default();

    let sorted_keys = |search: SearchParams| {
        let couriers = [setup::create_courier(3, |_| {})].into_iter().collect();
        let params = DispatchParams {
            search,
            ..DispatchParams::default()
        };

        let mut keys = run(params, &policy, &orders, couriers)
            .iter()
            .map(|candidate| (candidate.canonical_key(), candidate.cost().to_bits()))
            .collect::<Vec<_>>();
        keys.sort();
        keys
    };

    let inline = sorted_keys(SearchParams::default());
    let strided = sorted_keys(SearchParams {
        subsets_per_worker: 10,
        max_workers: 4,
        ..SearchParams::default()
    });
    let ranges = sorted_keys(SearchParams {
        subsets_per_worker: 10,
        max_workers: 4,
        materialize_threshold: 0,
        ..SearchParams::default()
    });

    // 8 + 28 + 56 subsets of up to three orders
    assert_eq!(inline.len(), 92);
    assert_eq!(inline, strided);
    assert_eq!(inline, ranges);
}
