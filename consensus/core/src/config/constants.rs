pub mod consensus {
    //!
    //! A module for constants which directly impact consensus.
    //!

    use pink_math::Uint256;

    //
    // ~~~~~~~~~~~~~~~~~~~~~~~~~ Target limits ~~~~~~~~~~~~~~~~~~~~~~~~~
    //

    /// Easiest proof-of-work target on mainnet: `00000fff…ff`
    pub const MAINNET_POW_LIMIT: Uint256 = Uint256([u64::MAX, u64::MAX, u64::MAX, 0x0000_0fff_ffff_ffff]);

    /// Easiest proof-of-work target on testnet: `0000ffff…ff`
    pub const TESTNET_POW_LIMIT: Uint256 = Uint256([u64::MAX, u64::MAX, u64::MAX, 0x0000_ffff_ffff_ffff]);

    /// Easiest stake and flash-stake target on public networks: `003fff…ff`
    pub const STAKE_LIMIT: Uint256 = Uint256([u64::MAX, u64::MAX, u64::MAX, 0x003f_ffff_ffff_ffff]);

    /// Regression-test limit for every mode: `7fff…ff`
    pub const REGTEST_LIMIT: Uint256 = Uint256([u64::MAX, u64::MAX, u64::MAX, 0x7fff_ffff_ffff_ffff]);

    //
    // ~~~~~~~~~~~~~~~~~~~~~~~~~ Block timing (seconds) ~~~~~~~~~~~~~~~~~~~~~~~~~
    //

    pub const POW_TARGET_TIMESPAN: i64 = 60 * 60;
    pub const POW_TARGET_SPACING: i64 = 2 * 60;

    pub const POS_TARGET_TIMESPAN: i64 = 2 * 60 * 60;
    pub const POS_TARGET_SPACING: i64 = 6 * 60;

    pub const FLASH_POS_TARGET_TIMESPAN: i64 = 10 * 60;
    pub const FLASH_POS_TARGET_SPACING: i64 = 60;

    /// UTC hours of day during which stake blocks are flash stake blocks
    pub const FLASH_STAKE_HOURS: [u32; 4] = [15, 20, 1, 6];

    //
    // ~~~~~~~~~~~~~~~~~~~~~~~~~ Chain trust ~~~~~~~~~~~~~~~~~~~~~~~~~
    //

    /// Length of the window the stake trust baseline is sampled from. The baseline is
    /// refreshed once the chain grows this far past the height it was computed at.
    pub const STAKE_TRUST_WINDOW: u64 = 1024;

    /// A new candidate older than the tip by more than this many seconds, and built on a
    /// block below the tip's parent, is considered stale
    pub const STALE_CANDIDATE_AGE: u32 = 600;

    /// Stale candidates are scored as if their target were this many times easier
    pub const STALE_TARGET_MULTIPLIER: u64 = 10;

    //
    // ~~~~~~~~~~~~~~~~~~~~~~~~~ Difficulty ~~~~~~~~~~~~~~~~~~~~~~~~~
    //

    /// Generation-2 stake spacing is taken modulo this value, dropping the gaps between
    /// consecutive stake periods
    pub const STAKE_SPACING_MODULO: i64 = 60 * 60;
}
