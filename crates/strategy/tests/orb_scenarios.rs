use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use orb_core::{
    ExitReason, MarketEvent, OptionSide, OrbError, OrderError, OrderFill, OrderPlacer,
    OrderRequest, StrategyConfig, StrategyEvent, Tick,
};
use orb_data::{CsvReplayFeed, MemoryTradeJournal};
use orb_execution::PaperBroker;
use orb_strategy::{
    detect_breakout, LifecycleState, OpeningRange, OrbSession, RunOutcome, SessionRunner,
    SignalInputs,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, 2).unwrap()
}

fn config() -> StrategyConfig {
    StrategyConfig {
        underlying: "BANKNIFTY".into(),
        call_instrument: "BANKNIFTY24MAY48000CE".into(),
        put_instrument: "BANKNIFTY24MAY48000PE".into(),
        ..StrategyConfig::default()
    }
}

fn at_on(date: NaiveDate, h: u32, m: u32, s: u32) -> DateTime<Utc> {
    config().utc_at(date, NaiveTime::from_hms_opt(h, m, s).unwrap())
}

fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
    at_on(day(), h, m, s)
}

fn ce() -> String {
    config().call_instrument
}

fn pe() -> String {
    config().put_instrument
}

struct Harness {
    session: OrbSession,
    journal: Arc<MemoryTradeJournal>,
}

fn harness(config: StrategyConfig, broker: PaperBroker) -> Harness {
    let journal = Arc::new(MemoryTradeJournal::new());
    let session = OrbSession::new(config, day(), Arc::new(broker), journal.clone()).unwrap();
    Harness { session, journal }
}

fn paper() -> PaperBroker {
    PaperBroker::new(Decimal::ZERO)
}

/// Opening window prices [100, 105, 98, 102], then a quiet first trade-window tick.
async fn open_the_day(session: &mut OrbSession, option_ltp: Decimal) {
    for (i, price) in [dec!(100), dec!(105), dec!(98), dec!(102)]
        .into_iter()
        .enumerate()
    {
        session
            .on_tick(Tick::new(at(9, 15 + i as u32, 0), price, dec!(800)))
            .await
            .unwrap();
    }
    session
        .on_option_tick(&ce(), Tick::quote(at(9, 19, 0), option_ltp))
        .await
        .unwrap();
    session
        .on_tick(Tick::new(at(9, 20, 0), dec!(101), dec!(800)))
        .await
        .unwrap();
}

fn opened(events: &[StrategyEvent]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, StrategyEvent::PositionOpened(_)))
        .count()
}

#[test]
fn breakout_over_range_and_vwap_on_strong_volume_is_call() {
    let inputs = SignalInputs {
        price: dec!(110),
        volume: dec!(1500),
        opening_range: Some(OpeningRange {
            high: dec!(105),
            low: dec!(98),
        }),
        vwap: Some(dec!(101)),
        average_volume: dec!(800),
    };
    assert_eq!(detect_breakout(&inputs), Some(OptionSide::Call));
}

#[tokio::test]
async fn opening_range_then_call_breakout_end_to_end() {
    let mut h = harness(config(), paper());
    open_the_day(&mut h.session, dec!(100)).await;

    assert_eq!(
        h.session.opening_range(),
        Some(OpeningRange {
            high: dec!(105),
            low: dec!(98)
        })
    );
    assert_eq!(h.session.average_volume(), dec!(800));

    let events = h
        .session
        .on_tick(Tick::new(at(9, 21, 0), dec!(110), dec!(1500)))
        .await
        .unwrap();

    assert!(matches!(
        events.first(),
        Some(StrategyEvent::EntryRequested {
            side: OptionSide::Call,
            ..
        })
    ));
    let position = h.session.position().unwrap();
    assert_eq!(position.side, OptionSide::Call);
    assert_eq!(position.entry_price, dec!(100));
    assert_eq!(position.quantity, dec!(15));
}

#[tokio::test]
async fn target_reached_before_stop_exits_on_target() {
    let mut h = harness(config(), paper());
    open_the_day(&mut h.session, dec!(100)).await;
    h.session
        .on_tick(Tick::new(at(9, 21, 0), dec!(110), dec!(1500)))
        .await
        .unwrap();

    h.session
        .on_option_tick(&ce(), Tick::quote(at(9, 22, 0), dec!(181)))
        .await
        .unwrap();
    h.session
        .on_option_tick(&ce(), Tick::quote(at(9, 23, 0), dec!(50)))
        .await
        .unwrap();

    let trades = h.journal.trades();
    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0].exit_reason, ExitReason::Target);
    assert_eq!(trades[0].pnl, dec!(1215));
}

#[tokio::test]
async fn stop_hit_before_target_exits_on_stop() {
    let mut h = harness(config(), paper());
    open_the_day(&mut h.session, dec!(100)).await;
    h.session
        .on_tick(Tick::new(at(9, 21, 0), dec!(110), dec!(1500)))
        .await
        .unwrap();

    h.session
        .on_option_tick(&ce(), Tick::quote(at(9, 22, 0), dec!(49)))
        .await
        .unwrap();
    h.session
        .on_option_tick(&ce(), Tick::quote(at(9, 23, 0), dec!(181)))
        .await
        .unwrap();

    let trades = h.journal.trades();
    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0].exit_reason, ExitReason::Stop);
    assert_eq!(trades[0].pnl, dec!(-765));
}

#[tokio::test]
async fn put_breakdown_books_entry_minus_ltp() {
    let mut h = harness(config(), paper());
    open_the_day(&mut h.session, dec!(100)).await;
    h.session
        .on_option_tick(&pe(), Tick::quote(at(9, 20, 30), dec!(100)))
        .await
        .unwrap();

    let events = h
        .session
        .on_tick(Tick::new(at(9, 21, 0), dec!(95), dec!(1500)))
        .await
        .unwrap();
    assert!(matches!(
        events.first(),
        Some(StrategyEvent::EntryRequested {
            side: OptionSide::Put,
            instrument,
            ..
        }) if *instrument == pe()
    ));
    let position = h.session.position().unwrap();
    assert_eq!(position.side, OptionSide::Put);
    assert_eq!(position.entry_price, dec!(100));

    // premium falls 80 points: target
    h.session
        .on_option_tick(&pe(), Tick::quote(at(9, 22, 0), dec!(20)))
        .await
        .unwrap();
    assert_eq!(h.session.state(), &LifecycleState::Idle);

    // second breakdown enters at 20, premium rises 50 points: stop
    let events = h
        .session
        .on_tick(Tick::new(at(9, 23, 0), dec!(94), dec!(5000)))
        .await
        .unwrap();
    assert_eq!(opened(&events), 1);
    h.session
        .on_option_tick(&pe(), Tick::quote(at(9, 24, 0), dec!(70)))
        .await
        .unwrap();

    let trades = h.journal.trades();
    assert_eq!(trades.len(), 2);
    assert_eq!(trades[0].instrument, pe());
    assert_eq!(trades[0].exit_reason, ExitReason::Target);
    assert_eq!(trades[0].pnl_points, dec!(80));
    assert_eq!(trades[0].pnl, dec!(1200));
    assert_eq!(trades[1].entry_price, dec!(20));
    assert_eq!(trades[1].exit_reason, ExitReason::Stop);
    assert_eq!(trades[1].pnl, dec!(-750));
    assert_eq!(h.session.ledger().realized_pnl(), dec!(450));
}

#[tokio::test]
async fn two_large_losses_halt_the_session() {
    let cfg = StrategyConfig {
        lot_size: 1,
        lots: 1,
        daily_max_loss: dec!(3000),
        ..config()
    };
    let mut h = harness(cfg, paper());
    open_the_day(&mut h.session, dec!(2000)).await;

    // first loss: daily_max_loss / 2 + 1
    h.session
        .on_tick(Tick::new(at(9, 21, 0), dec!(110), dec!(1500)))
        .await
        .unwrap();
    h.session
        .on_option_tick(&ce(), Tick::quote(at(9, 22, 0), dec!(499)))
        .await
        .unwrap();
    assert_eq!(h.session.state(), &LifecycleState::Idle);

    // second loss of the same size
    h.session
        .on_option_tick(&ce(), Tick::quote(at(9, 22, 30), dec!(2000)))
        .await
        .unwrap();
    let events = h
        .session
        .on_tick(Tick::new(at(9, 23, 0), dec!(112), dec!(5000)))
        .await
        .unwrap();
    assert_eq!(opened(&events), 1);
    let events = h
        .session
        .on_option_tick(&ce(), Tick::quote(at(9, 24, 0), dec!(499)))
        .await
        .unwrap();
    assert!(matches!(
        events.last(),
        Some(StrategyEvent::Halted { realized_pnl }) if *realized_pnl == dec!(-3002)
    ));

    // a qualifying breakout no longer enters
    let events = h
        .session
        .on_tick(Tick::new(at(9, 25, 0), dec!(115), dec!(20000)))
        .await
        .unwrap();
    assert!(events.is_empty());
    assert_eq!(h.session.state(), &LifecycleState::Halted);
    assert_eq!(h.journal.len(), 2);

    let report = h.session.report();
    assert!(report.halted);
    assert_eq!(report.losses, 2);
    assert_eq!(report.realized_pnl, dec!(-3002));
}

#[tokio::test]
async fn replayed_tick_is_counted_once() {
    let mut once = harness(config(), paper());
    let mut twice = harness(config(), paper());

    let ticks = [
        Tick::new(at(9, 15, 0), dec!(100), dec!(700)),
        Tick::new(at(9, 20, 0), dec!(100), dec!(900)),
        Tick::new(at(9, 21, 0), dec!(99), dec!(300)),
    ];
    for tick in ticks {
        once.session.on_tick(tick).await.unwrap();
        twice.session.on_tick(tick).await.unwrap();
        twice.session.on_tick(tick).await.unwrap();
    }

    assert_eq!(once.session.vwap(), twice.session.vwap());
    assert_eq!(
        once.session.average_volume(),
        twice.session.average_volume()
    );
    assert_eq!(twice.session.average_volume(), dec!(600));
}

#[tokio::test]
async fn never_more_than_one_position() {
    let mut h = harness(config(), paper());
    open_the_day(&mut h.session, dec!(100)).await;

    let mut open = 0_i32;
    let mut seed: u64 = 7;
    let mut next = |range: u64| {
        seed = seed.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
        (seed >> 33) % range
    };

    for i in 0..300_u32 {
        let ts = at(9, 20, 30) + chrono::Duration::seconds(i64::from(i) * 7);
        let event = if next(2) == 0 {
            let price = Decimal::from(90 + next(25));
            let volume = Decimal::from(100 + next(3000));
            MarketEvent::UnderlyingTick(Tick::new(ts, price, volume))
        } else {
            let instrument = if next(2) == 0 {
                ce()
            } else {
                config().put_instrument
            };
            MarketEvent::OptionTick {
                instrument,
                tick: Tick::quote(ts, Decimal::from(40 + next(160))),
            }
        };

        for e in h.session.on_event(event).await.unwrap() {
            match e {
                StrategyEvent::PositionOpened(_) => open += 1,
                StrategyEvent::PositionClosed(_) => open -= 1,
                _ => {}
            }
            assert!((0..=1).contains(&open), "open positions: {open}");
        }
    }
}

#[tokio::test(start_paused = true)]
async fn entry_timeout_is_surfaced_and_held_until_resolved() {
    let broker = paper().with_latency(Duration::from_secs(30));
    let mut h = harness(config(), broker);
    open_the_day(&mut h.session, dec!(100)).await;

    let err = h
        .session
        .on_tick(Tick::new(at(9, 21, 0), dec!(110), dec!(1500)))
        .await
        .unwrap_err();
    assert!(matches!(err, OrbError::OrderAmbiguous { .. }));
    assert!(err.needs_operator());
    assert!(matches!(
        h.session.state(),
        LifecycleState::Entering {
            side: OptionSide::Call,
            ..
        }
    ));

    // still in doubt: a fresh breakout must not place another order
    let events = h
        .session
        .on_tick(Tick::new(at(9, 22, 0), dec!(115), dec!(9000)))
        .await
        .unwrap();
    assert!(events.is_empty());

    let events = h.session.resolve_ambiguous(None, at(9, 23, 0)).await.unwrap();
    assert!(matches!(
        events.as_slice(),
        [StrategyEvent::EntryRejected { .. }]
    ));
    assert_eq!(h.session.state(), &LifecycleState::Idle);
    assert!(h.journal.is_empty());
}

fn quiet_day(date: NaiveDate) -> Vec<MarketEvent> {
    [(15, dec!(100)), (16, dec!(104)), (21, dec!(102))]
        .into_iter()
        .map(|(m, price)| {
            MarketEvent::UnderlyingTick(Tick::new(at_on(date, 9, m, 0), price, dec!(500)))
        })
        .collect()
}

#[tokio::test]
async fn runner_starts_a_fresh_session_each_day() {
    let next_day = NaiveDate::from_ymd_opt(2024, 5, 3).unwrap();

    let mut events = quiet_day(day());
    events.push(MarketEvent::OptionTick {
        instrument: ce(),
        tick: Tick::quote(at(9, 21, 30), dec!(100)),
    });
    events.push(MarketEvent::UnderlyingTick(Tick::new(
        at(9, 22, 0),
        dec!(110),
        dec!(5000),
    )));
    events.push(MarketEvent::OptionTick {
        instrument: ce(),
        tick: Tick::quote(at(9, 23, 0), dec!(185)),
    });
    events.extend(quiet_day(next_day));

    let journal = Arc::new(MemoryTradeJournal::new());
    let mut runner = SessionRunner::new(config(), Arc::new(paper()), journal.clone()).unwrap();
    let mut feed = CsvReplayFeed::from_events(events);

    let RunOutcome::Completed(reports) = runner.run(&mut feed).await.unwrap() else {
        panic!("run should complete");
    };

    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].trading_date, day());
    assert_eq!(reports[0].trades, 1);
    assert_eq!(reports[0].realized_pnl, dec!(1275));
    assert_eq!(reports[1].trading_date, next_day);
    assert_eq!(reports[1].trades, 0);
    assert_eq!(reports[1].realized_pnl, Decimal::ZERO);
    assert_eq!(reports[1].final_state, "IDLE");
    assert_eq!(journal.len(), 1);
}

/// Paper fills, except the `slow_order`-th order (1-based), which takes a minute.
struct SlowNthOrder {
    fast: PaperBroker,
    slow: PaperBroker,
    slow_order: usize,
    placed: AtomicUsize,
}

impl SlowNthOrder {
    fn new(slow_order: usize) -> Self {
        Self {
            fast: paper(),
            slow: paper().with_latency(Duration::from_secs(60)),
            slow_order,
            placed: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl OrderPlacer for SlowNthOrder {
    async fn place(&self, order: &OrderRequest) -> Result<OrderFill, OrderError> {
        let n = self.placed.fetch_add(1, Ordering::SeqCst) + 1;
        if n == self.slow_order {
            self.slow.place(order).await
        } else {
            self.fast.place(order).await
        }
    }
}

fn breakout_then_target(date: NaiveDate) -> Vec<MarketEvent> {
    let mut events = quiet_day(date);
    events.push(MarketEvent::OptionTick {
        instrument: ce(),
        tick: Tick::quote(at_on(date, 9, 21, 30), dec!(100)),
    });
    events.push(MarketEvent::UnderlyingTick(Tick::new(
        at_on(date, 9, 22, 0),
        dec!(110),
        dec!(5000),
    )));
    events.push(MarketEvent::OptionTick {
        instrument: ce(),
        tick: Tick::quote(at_on(date, 9, 30, 0), dec!(185)),
    });
    events
}

#[tokio::test(start_paused = true)]
async fn runner_suspends_on_ambiguous_order_and_resumes_after_resolution() {
    let next_day = NaiveDate::from_ymd_opt(2024, 5, 3).unwrap();
    let mut events = breakout_then_target(day());
    events.extend(breakout_then_target(next_day));

    let journal = Arc::new(MemoryTradeJournal::new());
    // day one uses orders 1 and 2, day two's entry times out
    let mut runner =
        SessionRunner::new(config(), Arc::new(SlowNthOrder::new(3)), journal.clone()).unwrap();
    let mut feed = CsvReplayFeed::from_events(events);

    let RunOutcome::Suspended { reports, error } = runner.run(&mut feed).await.unwrap() else {
        panic!("run should suspend on the timed-out entry");
    };
    assert!(error.needs_operator());
    assert!(matches!(error, OrbError::OrderAmbiguous { .. }));
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].trading_date, day());
    assert_eq!(reports[0].realized_pnl, dec!(1275));
    assert_eq!(journal.len(), 1);

    let pending = runner.pending_mut().unwrap();
    assert_eq!(pending.trading_date(), next_day);
    assert_eq!(pending.state().name(), "ENTERING");
    let fill = OrderFill {
        order_id: "PAPER-late".into(),
        fill_price: dec!(100),
        quantity: dec!(15),
        filled_at: at_on(next_day, 9, 22, 0),
    };
    pending
        .resolve_ambiguous(Some(fill), at_on(next_day, 9, 25, 0))
        .await
        .unwrap();
    assert_eq!(
        runner.current().unwrap().position().unwrap().entry_time,
        at_on(next_day, 9, 22, 0)
    );
    assert!(runner.pending_mut().is_none());

    let RunOutcome::Completed(reports) = runner.run(&mut feed).await.unwrap() else {
        panic!("resumed run should complete");
    };
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].trading_date, next_day);
    assert_eq!(reports[0].trades, 1);
    assert_eq!(reports[0].realized_pnl, dec!(1275));
    assert_eq!(journal.len(), 2);
    assert!(runner.current().is_none());
}
