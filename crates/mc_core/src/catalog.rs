//! Reward catalog and weighted selection.
//!
//! Catalog order is significant: it is the order the reel steps through.
//! Weights are relative and normalised at selection time, so `[1, 1, 2]`
//! and `[10, 10, 20]` describe the same distribution.

use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::random::RandomSource;

#[derive(Debug, Clone, PartialEq)]
pub struct RewardItem {
    pub id: String,
    pub name: String,
    /// Opaque image handle; the presentation layer decides how to resolve it.
    pub image_ref: String,
    pub weight: f64,
    pub colors: HatColors,
}

/// Card colours used when the image handle cannot be displayed directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct HatColors {
    pub primary: [u8; 3],
    pub accent: [u8; 3],
}

impl Default for HatColors {
    fn default() -> Self {
        Self {
            primary: [0xff, 0x7a, 0x59],
            accent: [0x2b, 0x1b, 0x2d],
        }
    }
}

#[derive(Debug, Clone)]
pub struct Catalog {
    pub catalog_id: String,
    items: Vec<RewardItem>,
}

impl Catalog {
    pub fn new(catalog_id: &str, items: Vec<RewardItem>) -> Result<Self, String> {
        validate_items(&items)?;
        Ok(Self {
            catalog_id: catalog_id.to_string(),
            items,
        })
    }

    /// The five launch hats, used when no catalog file is available.
    pub fn builtin() -> Self {
        let palette: [([u8; 3], [u8; 3]); 5] = [
            ([0xff, 0x7a, 0x59], [0x2b, 0x1b, 0x2d]),
            ([0x1c, 0x25, 0x41], [0xf4, 0xd3, 0x5e]),
            ([0x3a, 0x86, 0xff], [0x22, 0x22, 0x3b]),
            ([0xff, 0x00, 0x6e], [0x0b, 0x13, 0x20]),
            ([0xf6, 0xbd, 0x60], [0x5a, 0x3a, 0x1a]),
        ];
        let items = palette
            .iter()
            .enumerate()
            .map(|(i, &(primary, accent))| RewardItem {
                id: format!("ZS-{:02}", i + 1),
                name: format!("Zombie Slayer ZS-{:02}", i + 1),
                image_ref: format!("hats/hat{}.png", i + 1),
                weight: 1.0,
                colors: HatColors { primary, accent },
            })
            .collect();
        Self {
            catalog_id: "builtin".to_string(),
            items,
        }
    }

    pub fn items(&self) -> &[RewardItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&RewardItem> {
        self.items.get(index)
    }

    pub fn weights(&self) -> SpinWeights {
        SpinWeights {
            weights: self.items.iter().map(|i| i.weight).collect(),
        }
    }
}

/// Weight table derived from a catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct SpinWeights {
    weights: Vec<f64>,
}

impl SpinWeights {
    pub fn new(weights: Vec<f64>) -> Result<Self, String> {
        if weights.is_empty() {
            return Err("weight table is empty".to_string());
        }
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err("weights must be finite and non-negative".to_string());
        }
        if weights.iter().sum::<f64>() <= 0.0 {
            return Err("sum of weights must be positive".to_string());
        }
        Ok(Self { weights })
    }

    pub fn total(&self) -> f64 {
        self.weights.iter().sum()
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn select(&self, rng: &mut dyn RandomSource) -> usize {
        select_weighted(&self.weights, rng)
    }
}

/// Pick an index with probability proportional to its weight.
///
/// Draws `r` in `[0, total)` and walks the table subtracting weights; the
/// first index whose remainder drops to `<= 0` wins. Zero-weight entries are
/// skipped so they can never win, even on an exact `r == 0` draw.
pub fn select_weighted(weights: &[f64], rng: &mut dyn RandomSource) -> usize {
    let total: f64 = weights.iter().filter(|w| **w > 0.0).sum();
    let mut remainder = rng.next_unit() * total;
    for (i, &w) in weights.iter().enumerate() {
        if w <= 0.0 {
            continue;
        }
        remainder -= w;
        if remainder <= 0.0 {
            return i;
        }
    }
    // Rounding can leave a sliver of remainder; settle on the last reachable item.
    weights
        .iter()
        .rposition(|w| *w > 0.0)
        .unwrap_or(weights.len().saturating_sub(1))
}

// --- JSON deserialization types (private) ---

#[derive(Debug, Deserialize)]
struct CatalogFileJson {
    version: String,
    catalog_id: String,
    items: Vec<RewardItemJson>,
}

#[derive(Debug, Deserialize)]
struct RewardItemJson {
    id: String,
    name: String,
    image: String,
    weight: f64,
    #[serde(default)]
    colors: Option<HatColors>,
}

/// Load and validate a catalog file.
pub fn load_catalog(path: &Path) -> Result<Catalog, String> {
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read catalog file {}: {e}", path.display()))?;
    let json: CatalogFileJson = serde_json::from_str(&raw)
        .map_err(|e| format!("Failed to parse catalog file {}: {e}", path.display()))?;
    if json.version != "0.1" {
        return Err(format!(
            "Catalog validation failed: unsupported version '{}'",
            json.version
        ));
    }
    let items = json
        .items
        .into_iter()
        .map(|item| RewardItem {
            id: item.id,
            name: item.name,
            image_ref: item.image,
            weight: item.weight,
            colors: item.colors.unwrap_or_default(),
        })
        .collect();
    Catalog::new(&json.catalog_id, items)
}

fn validate_items(items: &[RewardItem]) -> Result<(), String> {
    if items.is_empty() {
        return Err("Catalog validation failed: items array is empty".to_string());
    }
    let mut ids = HashSet::new();
    for item in items {
        if item.id.is_empty() {
            return Err(format!(
                "Catalog validation failed: item '{}' has empty id",
                item.name
            ));
        }
        if !ids.insert(item.id.as_str()) {
            return Err(format!(
                "Catalog validation failed: duplicate item id '{}'",
                item.id
            ));
        }
        if !item.weight.is_finite() || item.weight < 0.0 {
            return Err(format!(
                "Catalog validation failed: item '{}' has invalid weight {}",
                item.id, item.weight
            ));
        }
    }
    if items.iter().map(|i| i.weight).sum::<f64>() <= 0.0 {
        return Err("Catalog validation failed: total weight must be positive".to_string());
    }
    Ok(())
}
