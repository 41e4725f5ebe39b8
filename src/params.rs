/// Process-wide simulation parameters: the global knobs of the pack program.
///
/// All percent fields are expressed on a 0-100 scale, not as fractions.
/// The struct is a plain caller-owned value; the engine never holds onto it
/// between calls.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameters {
    /// Number of packs sold in this simulation
    pub num_packs: u32,
    /// Price customers pay per pack
    pub cost_per_pack: f64,
    /// Share of an item's market value paid to acquire it; cost basis = market value * this
    pub product_cost_percent: f64,
    /// Share of an item's cost basis paid out when it is sold back
    pub buyback_percent: f64,
    /// Share of the buyback value retained as commission
    pub commission_percent: f64,
    /// Platform fee on each pack sale, owed only when selling on someone else's platform
    pub platform_fee_percent: f64,
    /// true = the operator IS the platform, so the platform fee is zero
    pub include_platform_fees: bool,
    /// Payment processor percentage on pack sales
    pub payment_processing_percent: f64,
    /// Payment processor flat fee per pack sale
    pub payment_processing_flat: f64,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            num_packs: 1000,
            cost_per_pack: 100.0,
            product_cost_percent: 95.0,
            buyback_percent: 90.0,
            commission_percent: 10.0,
            platform_fee_percent: 6.0,
            include_platform_fees: true,
            payment_processing_percent: 2.9,
            payment_processing_flat: 0.30,
        }
    }
}

impl Parameters {
    /// Quick config with all transaction fees zeroed out, for isolating the
    /// buyback economics
    pub fn without_transaction_fees() -> Self {
        Self {
            platform_fee_percent: 0.0,
            include_platform_fees: true,
            payment_processing_percent: 0.0,
            payment_processing_flat: 0.0,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_fee_switch() {
        // Operator is the platform by default, so no platform fee applies
        let params = Parameters::default();
        assert!(params.include_platform_fees);
        assert_eq!(params.platform_fee_percent, 6.0);
    }

    #[test]
    fn test_without_transaction_fees() {
        let params = Parameters::without_transaction_fees();
        assert_eq!(params.payment_processing_percent, 0.0);
        assert_eq!(params.payment_processing_flat, 0.0);
        assert_eq!(params.platform_fee_percent, 0.0);
        // Untouched base economics keep their defaults
        assert_eq!(params.num_packs, 1000);
        assert_eq!(params.buyback_percent, 90.0);
    }
}
