use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use orderbook::{Order, OrderBook, PriceLevels, Side};

fn order(id: u64, symbol: &str, side: Side, price: f64, qty: i64, ts: i64) -> Order {
    Order {
        order_id: format!("O{id}"),
        agent_id: "bench".to_string(),
        symbol: symbol.to_string(),
        side,
        price,
        quantity: qty,
        timestamp: ts,
    }
}

fn bench_order_submission(c: &mut Criterion) {
    let mut group = c.benchmark_group("order_submission");

    for &num_orders in [100, 1000, 10000].iter() {
        group.bench_with_input(
            BenchmarkId::new("non_crossing_orders", num_orders),
            &num_orders,
            |b, &num_orders| {
                b.iter(|| {
                    let mut ob = OrderBook::new("AAPL");
                    for i in 0..num_orders {
                        let side = if i % 2 == 0 { Side::Buy } else { Side::Sell };
                        let price = if i % 2 == 0 {
                            100.0 - (i as f64) * 0.01
                        } else {
                            101.0 + (i as f64) * 0.01
                        };
                        let o = order(i as u64, "AAPL", side, price, 100, i as i64);
                        black_box(ob.add_limit_order(o, false));
                    }
                })
            },
        );
    }

    group.finish();
}

fn bench_order_matching(c: &mut Criterion) {
    let mut group = c.benchmark_group("order_matching");

    for &depth in [10, 100, 1000].iter() {
        group.bench_with_input(
            BenchmarkId::new("crossing_orders", depth),
            &depth,
            |b, &depth| {
                b.iter_batched(
                    || {
                        let mut ob = OrderBook::new("AAPL");
                        for i in 0..depth {
                            let ask = order(i as u64, "AAPL", Side::Sell, 100.0 + i as f64 * 0.01, 100, i as i64);
                            ob.add_limit_order(ask, false);

                            let bid = order(
                                (i + depth) as u64,
                                "AAPL",
                                Side::Buy,
                                99.99 - i as f64 * 0.01,
                                100,
                                i as i64,
                            );
                            ob.add_limit_order(bid, false);
                        }
                        ob
                    },
                    |mut ob| {
                        let crossing = order(
                            (depth * 2) as u64,
                            "AAPL",
                            Side::Buy,
                            100.0 + depth as f64,
                            (depth * 50) as i64,
                            0,
                        );
                        black_box(ob.add_limit_order(crossing, false))
                    },
                    criterion::BatchSize::SmallInput,
                )
            },
        );
    }

    group.finish();
}

fn bench_market_data_access(c: &mut Criterion) {
    let mut group = c.benchmark_group("market_data");

    let mut ob = OrderBook::new("AAPL");
    for i in 0..1000u64 {
        let ask = order(i, "AAPL", Side::Sell, 100.0 + i as f64 * 0.01, 100, i as i64);
        ob.add_limit_order(ask, false);
        let bid = order(i + 1000, "AAPL", Side::Buy, 99.99 - i as f64 * 0.01, 100, i as i64);
        ob.add_limit_order(bid, false);
    }

    group.bench_function("best_bid", |b| b.iter(|| black_box(ob.best_bid())));

    group.bench_function("best_ask", |b| b.iter(|| black_box(ob.best_ask())));

    group.bench_function("snapshot_depth_10", |b| {
        b.iter(|| black_box(ob.get_order_book_snapshot(10)))
    });

    group.finish();
}

fn bench_price_levels_operations(c: &mut Criterion) {
    let mut group = c.benchmark_group("price_levels");

    let mut bids = PriceLevels::new(Side::Buy);
    let mut asks = PriceLevels::new(Side::Sell);

    for i in 0..1000u64 {
        let bid_order = order(i, "AAPL", Side::Buy, 99.99 - i as f64 * 0.01, 100, i as i64);
        let ask_order = order(i + 1000, "AAPL", Side::Sell, 100.0 + i as f64 * 0.01, 100, i as i64);
        bids.push(bid_order);
        asks.push(ask_order);
    }

    group.bench_function("best_price_bid", |b| b.iter(|| black_box(bids.best_price())));

    group.bench_function("best_price_ask", |b| b.iter(|| black_box(asks.best_price())));

    group.bench_function("total_quantity_bid", |b| {
        b.iter(|| black_box(bids.total_quantity(None)))
    });

    group.bench_function("depth_10", |b| b.iter(|| black_box(bids.depth(Some(10)))));

    group.finish();
}

fn bench_order_cancellation(c: &mut Criterion) {
    let mut group = c.benchmark_group("cancellation");

    for &num_orders in [100, 1000].iter() {
        group.bench_with_input(
            BenchmarkId::new("eager_cancel", num_orders),
            &num_orders,
            |b, &num_orders| {
                b.iter_batched(
                    || {
                        let mut ob = OrderBook::new("AAPL");
                        let mut order_ids = Vec::new();
                        for i in 0..num_orders {
                            let o = order(i as u64, "AAPL", Side::Buy, 100.0, 100, i as i64);
                            order_ids.push(o.order_id.clone());
                            ob.add_limit_order(o, false);
                        }
                        (ob, order_ids)
                    },
                    |(mut ob, order_ids)| {
                        for (i, order_id) in order_ids.iter().enumerate() {
                            if i % 2 == 0 {
                                black_box(ob.cancel_order(order_id));
                            }
                        }
                    },
                    criterion::BatchSize::SmallInput,
                )
            },
        );
    }

    group.finish();
}

fn bench_high_frequency_scenario(c: &mut Criterion) {
    let mut group = c.benchmark_group("hft_scenario");

    group.bench_function("rapid_order_flow", |b| {
        b.iter(|| {
            let mut ob = OrderBook::new("AAPL");
            let mut order_id = 1u64;

            for round in 0..100i64 {
                for i in 0..5i64 {
                    let ask = order(order_id, "AAPL", Side::Sell, 100.0 + i as f64, 100, round);
                    order_id += 1;
                    ob.add_limit_order(ask, false);

                    let bid = order(order_id, "AAPL", Side::Buy, 99.0 - i as f64, 100, round);
                    order_id += 1;
                    ob.add_limit_order(bid, false);
                }

                let crossing = order(order_id, "AAPL", Side::Buy, 102.0, 300, round);
                order_id += 1;
                black_box(ob.add_limit_order(crossing, false));

                black_box(ob.best_bid());
                black_box(ob.best_ask());
            }
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_order_submission,
    bench_order_matching,
    bench_market_data_access,
    bench_price_levels_operations,
    bench_order_cancellation,
    bench_high_frequency_scenario
);

criterion_main!(benches);
