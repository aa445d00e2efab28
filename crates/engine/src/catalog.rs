use serde::{Deserialize, Serialize};

/// A purchasable device definition. Immutable reference data; owned
/// devices snapshot the price at purchase time so later catalog edits do
/// not change existing economics.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceDefinition {
    pub id: &'static str,
    pub display_name: &'static str,
    /// Price in USD, always positive.
    pub price: f64,
    pub duration_days: u32,
    pub daily_profit_percent: f64,
    pub hashrate_label: &'static str,
    pub icon_ref: &'static str,
}

/// The fixed market catalog.
pub static DEVICE_CATALOG: [DeviceDefinition; 8] = [
    DeviceDefinition {
        id: "pkg-1",
        display_name: "Antminer S9 Classic",
        price: 12.0,
        duration_days: 15,
        daily_profit_percent: 2.5,
        hashrate_label: "14 TH/s",
        icon_ref: "assets/antminer-s9.jpg",
    },
    DeviceDefinition {
        id: "pkg-2",
        display_name: "Whatsminer M30S",
        price: 40.0,
        duration_days: 30,
        daily_profit_percent: 2.5,
        hashrate_label: "88 TH/s",
        icon_ref: "assets/whatsminer-m30s.jpg",
    },
    DeviceDefinition {
        id: "pkg-3",
        display_name: "GPU Rig RTX 3090 Array",
        price: 80.0,
        duration_days: 45,
        daily_profit_percent: 2.5,
        hashrate_label: "1.2 GH/s",
        icon_ref: "assets/gpu-rig.jpg",
    },
    DeviceDefinition {
        id: "pkg-4",
        display_name: "Antminer S19 Pro",
        price: 180.0,
        duration_days: 60,
        daily_profit_percent: 2.5,
        hashrate_label: "110 TH/s",
        icon_ref: "assets/antminer-s19.jpg",
    },
    DeviceDefinition {
        id: "pkg-5",
        display_name: "Mining Farm Unit",
        price: 300.0,
        duration_days: 90,
        daily_profit_percent: 2.5,
        hashrate_label: "500 TH/s",
        icon_ref: "assets/mining-farm.jpg",
    },
    DeviceDefinition {
        id: "pkg-6",
        display_name: "Enterprise Data Center",
        price: 500.0,
        duration_days: 120,
        daily_profit_percent: 2.5,
        hashrate_label: "2.5 PH/s",
        icon_ref: "assets/enterprise-dc.jpg",
    },
    DeviceDefinition {
        id: "pkg-7",
        display_name: "Bitmain Antminer L7",
        price: 750.0,
        duration_days: 150,
        daily_profit_percent: 2.5,
        hashrate_label: "9.5 GH/s",
        icon_ref: "assets/antminer-l7.jpg",
    },
    DeviceDefinition {
        id: "pkg-8",
        display_name: "Immersion Mining Rack",
        price: 1000.0,
        duration_days: 180,
        daily_profit_percent: 2.5,
        hashrate_label: "18 PH/s",
        icon_ref: "assets/immersion-rack.jpg",
    },
];

/// The one-time welcome gift: tuned to yield exactly $5 over 24 hours.
pub static WELCOME_GIFT: DeviceDefinition = DeviceDefinition {
    id: "gift-001",
    display_name: "Turbo S9 Trial",
    price: 5.0,
    duration_days: 1,
    daily_profit_percent: 100.0,
    hashrate_label: "14 TH/s",
    icon_ref: "assets/antminer-s9.jpg",
};

/// Look up a catalog entry by definition id.
pub fn find_definition(id: &str) -> Option<&'static DeviceDefinition> {
    DEVICE_CATALOG.iter().find(|d| d.id == id)
}

/// The two sanctioned activation presets. Duration and daily rate are
/// paired here rather than passed as free-form numbers, so a caller cannot
/// activate a cycle with an unsanctioned pairing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleTier {
    /// 3 days at 2.0% daily.
    ShortCycle,
    /// 7 days at 2.5% daily.
    MediumCycle,
}

impl CycleTier {
    pub fn duration_days(self) -> u32 {
        match self {
            CycleTier::ShortCycle => 3,
            CycleTier::MediumCycle => 7,
        }
    }

    pub fn daily_rate_percent(self) -> f64 {
        match self {
            CycleTier::ShortCycle => 2.0,
            CycleTier::MediumCycle => 2.5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_lookup_finds_known_ids() {
        let def = find_definition("pkg-2").expect("pkg-2 should exist");
        assert_eq!(def.price, 40.0);
        assert!(find_definition("pkg-99").is_none());
    }

    #[test]
    fn tiers_pair_duration_with_rate() {
        assert_eq!(CycleTier::ShortCycle.duration_days(), 3);
        assert_eq!(CycleTier::ShortCycle.daily_rate_percent(), 2.0);
        assert_eq!(CycleTier::MediumCycle.duration_days(), 7);
        assert_eq!(CycleTier::MediumCycle.daily_rate_percent(), 2.5);
    }

    #[test]
    fn gift_yields_its_price_over_one_day() {
        // $5 at 100%/day over 1 day pays back exactly the device value.
        let daily = WELCOME_GIFT.price * WELCOME_GIFT.daily_profit_percent / 100.0;
        assert_eq!(daily * WELCOME_GIFT.duration_days as f64, 5.0);
    }
}
