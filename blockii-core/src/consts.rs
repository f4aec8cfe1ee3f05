/* Word geometry. Machine words are 15 bits stored in a u16 container;
 * the A and Q registers keep a 16th bit for overflow detection. */
pub const WORD_MASK: u16 = 0o77777;
pub const NEG_ZERO: u16 = 0o40000;

/* Central register file. Addresses below REG_FILE_SIZE are redirected to
 * the register file instead of banked memory. */
pub mod cpu {
    pub const REG_A: usize = 0o00;
    pub const REG_L: usize = 0o01;
    pub const REG_Q: usize = 0o02;
    pub const REG_EB: usize = 0o03;
    pub const REG_FB: usize = 0o04;
    pub const REG_Z: usize = 0o05;
    pub const REG_BB: usize = 0o06;
    pub const REG_ZRUPT: usize = 0o15;
    pub const REG_BRUPT: usize = 0o17;
    pub const REG_CYR: usize = 0o20;
    pub const REG_TIME2: usize = 0o24;
    pub const REG_TIME1: usize = 0o25;
    pub const REG_TIME3: usize = 0o26;
    pub const REG_TIME4: usize = 0o27;
    pub const REG_TIME5: usize = 0o30;
    pub const REG_TIME6: usize = 0o31;
    pub const REG_FILE_SIZE: usize = 0o61;

    /* Interrupt numbers. The vector for rupt i sits at 04000 + 4*i. */
    pub const RUPT_TIME6: u8 = 1;
    pub const RUPT_TIME5: u8 = 2;
    pub const RUPT_TIME3: u8 = 3;
    pub const RUPT_TIME4: u8 = 4;
    pub const RUPT_VECTOR_BASE: u16 = 0o4000;
}

/* Banked memory geometry. */
pub mod memmap {
    pub const RAM_NUM_BANKS: usize = 8;
    pub const RAM_BANK_SIZE: usize = 0o400;

    pub const ROM_NUM_BANKS: usize = 32;
    pub const ROM_NUM_SB_BANKS: usize = 8;
    pub const ROM_TOTAL_BANKS: usize = ROM_NUM_BANKS + ROM_NUM_SB_BANKS;
    pub const ROM_BANK_SIZE: usize = 0o2000;

    /* 12-bit instruction address space. */
    pub const ERASABLE_START: usize = 0o0000;
    pub const ERASABLE_END: usize = 0o1777;
    pub const ERASABLE_WINDOW_START: usize = 0o1400;
    pub const FIXED_WINDOW_START: usize = 0o2000;
    pub const FIXED_END: usize = 0o7777;
    pub const TOTAL_SIZE: usize = 0o10000;

    /* Superbank: with the super bit set, window banks 030..033 select
     * fixed banks 040..047 instead. */
    pub const SB_FIRST_BANK: usize = 0o30;
    pub const SB_BANK_OFFSET: usize = 0o10;
}

/* Counter timer intervals, in MCTs. One MCT is roughly 11.72us, which
 * puts the 10ms phase at 893 cycles. */
pub mod timer {
    pub const INTERVAL_10MS: i32 = 893;
    pub const OFFSET_7_5MS: i32 = -(INTERVAL_10MS * 3 / 4);
    pub const OFFSET_5MS: i32 = -(INTERVAL_10MS / 2);
}
