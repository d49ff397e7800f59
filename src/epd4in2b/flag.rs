/// Data bytes that follow the commands in [`super::cmd::Cmd`]
pub struct Flag;
#[allow(missing_docs)]
impl Flag {
    // Power Setting (0x01)
    pub const POWER_VDS_VDG_EN: u8 = 0x03; // internal source and gate power
    pub const POWER_VCOM_VGHL_DEFAULT: u8 = 0x00;
    pub const POWER_VDH: u8 = 0x2B; // +11V
    pub const POWER_VDL: u8 = 0x2B; // -11V
    pub const POWER_VDHR: u8 = 0xFF;
    pub const POWER_ALL_OFF: [u8; 5] = [0x00; 5]; // VG and VS to 0V fast

    // Booster Soft Start (0x06), one byte per phase
    pub const BOOSTER_SOFT_START_PHASE: u8 = 0x17;

    // Panel Setting (0x00)
    pub const PANEL_BW_LUT_FROM_REGISTER: u8 = 0x3F; // 400x300, B/W mode, LUT from registers

    // PLL Control (0x30)
    pub const PLL_50HZ: u8 = 0x3C;

    // VCOM and Data Interval Setting (0x50)
    pub const BORDER_FLOATING: u8 = 0x17;

    // Partial Window (0x90), trailing PTScan byte
    pub const PARTIAL_SCAN_INSIDE_ONLY: u8 = 0x00;

    // Deep Sleep (0x07) check code, the command is ignored without it
    pub const DEEP_SLEEP_CHECK: u8 = 0xA5;

    // Native pixel bytes
    pub const ALL_LIGHT: u8 = 0xFF;
    pub const ALL_DARK: u8 = 0x00;
}
