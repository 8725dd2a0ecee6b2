//! Property tests for swing extraction and the XABCD search.

use std::collections::BTreeSet;

use harmonix::prelude::*;
use proptest::prelude::*;

#[derive(Debug, Clone, Copy)]
struct TestBar {
    h: f64,
    l: f64,
}

impl OHLC for TestBar {
    fn open(&self) -> f64 {
        (self.h + self.l) / 2.0
    }

    fn high(&self) -> f64 {
        self.h
    }

    fn low(&self) -> f64 {
        self.l
    }

    fn close(&self) -> f64 {
        (self.h + self.l) / 2.0
    }
}

const MIRROR: f64 = 2000.0;

/// Integer-valued random walk, so mirrored prices stay exact
fn walk() -> impl Strategy<Value = Vec<TestBar>> {
    prop::collection::vec((-8i32..=8, 1i32..4), 20..120).prop_map(|steps| {
        let mut mid = 500;
        steps
            .into_iter()
            .map(|(step, half)| {
                mid += step;
                TestBar {
                    h: f64::from(mid + half),
                    l: f64::from(mid - half),
                }
            })
            .collect()
    })
}

fn mirror(bars: &[TestBar]) -> Vec<TestBar> {
    bars.iter()
        .map(|b| TestBar {
            h: MIRROR - b.l,
            l: MIRROR - b.h,
        })
        .collect()
}

/// Short legs and exact comparisons so random walks produce matches
fn engine() -> DefaultEngine {
    let config = EngineConfig {
        swing: SwingExtractor::new(
            Period::new(2).unwrap(),
            Ratio::new(0.0).unwrap(),
            Period::new(2).unwrap(),
        ),
        matcher: MatcherConfig {
            min_leg_bars: Period::new(4).unwrap(),
            tolerance: Ratio::new(0.0).unwrap(),
        },
        ..EngineConfig::default()
    };
    EngineBuilder::new()
        .with_all_families()
        .config(config)
        .build()
        .unwrap()
}

type Shape = (PatternFamily, Direction, [usize; 4], Vec<usize>);

fn shapes(matches: &[MatchResult], flip: bool) -> BTreeSet<Shape> {
    matches
        .iter()
        .map(|m| {
            let direction = if flip {
                m.direction().mirror()
            } else {
                m.direction()
            };
            (
                m.family(),
                direction,
                [m.x().index, m.a().index, m.b().index, m.c().index],
                m.d_indices(),
            )
        })
        .collect()
}

fn leg_intact(bars: &[TestBar], p: &SwingPoint, q: &SwingPoint) -> bool {
    let (lo, hi) = match p.kind {
        SwingKind::Low => (p.price, q.price),
        SwingKind::High => (q.price, p.price),
    };
    let (from, to) = (p.index.min(q.index), p.index.max(q.index));
    ((from + 1)..to).all(|i| bars[i].l >= lo && bars[i].h <= hi)
}

proptest! {
    #[test]
    fn swings_respect_spacing_and_order(bars in walk()) {
        let extractor = SwingExtractor::default();
        let swings = extractor.extract(&bars);
        for points in [&swings.lows, &swings.highs] {
            for w in points.windows(2) {
                prop_assert!(w[1].index >= w[0].index + extractor.min_spacing.get());
            }
        }
        for p in &swings.lows {
            prop_assert_eq!(p.price, bars[p.index].l);
        }
        for p in &swings.highs {
            prop_assert_eq!(p.price, bars[p.index].h);
        }
    }

    #[test]
    fn matches_are_ordered_and_unbroken(bars in walk()) {
        let engine = engine();
        for m in engine.scan(&bars).unwrap() {
            let (x, a, b, c) = (m.x(), m.a(), m.b(), m.c());
            prop_assert!(x.index < a.index);
            prop_assert!(a.index <= b.index);
            prop_assert!(b.index < c.index);
            prop_assert!(!m.d.is_empty());
            prop_assert_eq!(x.kind, m.direction().x_kind());
            prop_assert_eq!(a.kind, x.kind.opposite());

            prop_assert!(leg_intact(&bars, x, a));
            prop_assert!(leg_intact(&bars, a, b));
            prop_assert!(leg_intact(&bars, b, c));

            let mut last = c.index;
            for d in &m.d {
                prop_assert!(d.index > last);
                prop_assert!(leg_intact(&bars, c, d));
                last = d.index;
            }
        }
    }

    #[test]
    fn scanning_is_idempotent(bars in walk()) {
        let engine = engine();
        prop_assert_eq!(engine.scan(&bars).unwrap(), engine.scan(&bars).unwrap());
    }

    #[test]
    fn mirrored_prices_swap_direction(bars in walk()) {
        let engine = engine();
        let original = engine.scan(&bars).unwrap();
        let mirrored = engine.scan(&mirror(&bars)).unwrap();
        prop_assert_eq!(shapes(&original, false), shapes(&mirrored, true));
    }

    #[test]
    fn rising_series_has_no_patterns(start in 10i32..1000, step in 1i32..10, len in 10usize..200) {
        let bars: Vec<TestBar> = (0..len as i32)
            .map(|i| {
                let mid = f64::from(start + i * step);
                TestBar { h: mid + 0.5, l: mid - 0.5 }
            })
            .collect();
        let engine = EngineBuilder::new().with_all_families().build().unwrap();
        prop_assert!(engine.extract_swings(&bars).is_empty());
        prop_assert!(engine.scan(&bars).unwrap().is_empty());
    }

    #[test]
    fn fibonacci_identities(low in -100_000i32..100_000, span in 0i32..100_000) {
        let (l, h) = (f64::from(low), f64::from(low + span));
        prop_assert_eq!(retracement_up(l, h, 0.0), h);
        prop_assert_eq!(retracement_up(l, h, 1.0), l);
        prop_assert_eq!(retracement_down(l, h, 0.0), l);
        prop_assert_eq!(retracement_down(l, h, 1.0), h);
        prop_assert_eq!(extension_up(l, h, 0.0), h);
        prop_assert_eq!(extension_down(l, h, 0.0), l);
    }
}
