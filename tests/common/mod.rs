//! Deterministic synthetic price histories shared by the integration tests.

#![allow(dead_code)]

use allocbook::{PriceSeries, Symbol};

/// xorshift64, uniform in [-1, 1).
pub struct Noise(u64);

impl Noise {
    pub fn new(seed: u64) -> Self {
        Self(seed.max(1))
    }

    pub fn next(&mut self) -> f64 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 7;
        self.0 ^= self.0 << 17;
        (self.0 >> 11) as f64 / (1u64 << 52) as f64 - 1.0
    }
}

/// One synthetic asset: daily drift and idiosyncratic daily noise amplitude.
#[derive(Clone, Copy, Debug)]
pub struct AssetModel {
    pub name: &'static str,
    pub drift: f64,
    pub noise: f64,
}

pub const fn asset(name: &'static str, drift: f64, noise: f64) -> AssetModel {
    AssetModel { name, drift, noise }
}

/// Four assets with distinct risk/return so every objective has a unique answer.
pub const FOUR: [AssetModel; 4] = [
    asset("BOND", 0.0003, 0.002),
    asset("EQTY", 0.0006, 0.012),
    asset("GOLD", 0.0003, 0.008),
    asset("TECH", 0.0009, 0.020),
];

/// Random walk prices for `assets` over `days`, with a shared market factor.
pub fn history(assets: &[AssetModel], days: usize, seed: u64) -> PriceSeries {
    let mut noise = Noise::new(seed);
    let mut prices: Vec<f64> = vec![100.0; assets.len()];
    let mut series = PriceSeries::new();

    for day in 0..days {
        let market = 0.002 * noise.next();
        for (asset, price) in assets.iter().zip(prices.iter_mut()) {
            if day > 0 {
                *price *= 1.0 + asset.drift + market + asset.noise * noise.next();
            }
            series.push(Symbol::new(asset.name), day as i64, *price);
        }
    }

    series
}

pub fn sym(s: &str) -> Symbol {
    Symbol::new(s)
}
