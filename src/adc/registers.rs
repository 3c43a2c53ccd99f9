//! Register map and command encoding for the MAX22005-class 6-channel ADC.
//!
//! Addresses, command codes and flag bits as wired on this instrument's
//! frontend board. Register payloads are 24 bits wide, carried in the low
//! bits of a 32-bit container (see `bus` for the exchange framing).

// --- Register addresses ---

pub const GEN_PROD: u8 = 0x00;
pub const GEN_REV: u8 = 0x01;
pub const GEN_CNFG: u8 = 0x02;
pub const GEN_CHNL_CTRL: u8 = 0x03;
pub const GEN_GPIO_CTRL: u8 = 0x04;
pub const GEN_GPI_INT: u8 = 0x05;
pub const GEN_GPI_DATA: u8 = 0x06;
pub const GEN_INT: u8 = 0x07;
pub const GEN_INTEN: u8 = 0x08;
pub const GEN_PWR_CTRL: u8 = 0x09;

pub const DCHNL_CMD: u8 = 0x20;
pub const DCHNL_STA: u8 = 0x21;
pub const DCHNL_CTRL1: u8 = 0x22;
pub const DCHNL_CTRL2: u8 = 0x23;
pub const DCHNL_DATA: u8 = 0x24;
pub const DCHNL_N_SEL: u8 = 0x25;
pub const DCHNL_N_SOC: u8 = 0x26;
pub const DCHNL_N_SGC: u8 = 0x27;

// --- Identity and scaling ---

/// Identity byte of `GEN_PROD`, bits 23:16.
pub const PRODUCT_ID: u8 = 0x18;
/// Positive full-scale code of the 24-bit converter.
pub const DATA_RESOLUTION: i32 = 0x7F_FFFF;
/// Volts at positive full scale for this frontend.
pub const FULL_SCALE_VOLTAGE: f32 = 25.0;

// --- Conversion commands (DCHNL_CMD, shifted into bits 23:16) ---

pub const START_CONVERSION: u8 = 0x30;
pub const STOP_CONVERSION: u8 = 0x10;

// --- Input test-impedance flags (GEN_CHNL_CTRL bits 23:16) ---

pub const AIP_TEST_2MOHM_TO_AGND: u8 = 0x40;
pub const AIP_TEST_2MOHM_TO_HVDD: u8 = 0x80;
pub const AIP_TEST_2MOHM_TO_HVDD_AGND: u8 = 0xC0;
pub const AIN_TEST_DISABLED: u8 = 0x00;
pub const AIN_TEST_2MOHM_TO_AGND: u8 = 0x10;
pub const AIN_TEST_2MOHM_TO_HVDD: u8 = 0x20;
pub const AIN_TEST_2MOHM_TO_HVDD_AGND: u8 = 0x30;

/// Fixed test-impedance configuration for this instrument: both input legs
/// loaded 2 MΩ to AGND.
pub const TEST_FLAGS: u8 = AIP_TEST_2MOHM_TO_AGND | AIN_TEST_2MOHM_TO_AGND;

/// Control byte read flag (bit 0 of the first exchanged byte).
pub const SPI_READ_BIT: u8 = 0x01;

// --- Input channels ---

/// Input channel codes: 12 single-ended pins and 6 differential pairs.
/// Acquisition on this instrument exercises only the differential pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Channel {
    Ai1 = 0x00,
    Ai2 = 0x01,
    Ai3 = 0x02,
    Ai4 = 0x03,
    Ai5 = 0x04,
    Ai6 = 0x05,
    Ai7 = 0x06,
    Ai8 = 0x07,
    Ai9 = 0x08,
    Ai10 = 0x09,
    Ai11 = 0x0A,
    Ai12 = 0x0B,
    DiffAi1Ai2 = 0x0C,
    DiffAi3Ai4 = 0x0D,
    DiffAi5Ai6 = 0x0E,
    DiffAi7Ai8 = 0x0F,
    DiffAi9Ai10 = 0x10,
    DiffAi11Ai12 = 0x11,
}

/// The 6 differential pairs in acquisition order.
pub const DIFFERENTIAL_PAIRS: [Channel; 6] = [
    Channel::DiffAi1Ai2,
    Channel::DiffAi3Ai4,
    Channel::DiffAi5Ai6,
    Channel::DiffAi7Ai8,
    Channel::DiffAi9Ai10,
    Channel::DiffAi11Ai12,
];

impl Channel {
    /// All channel codes, ordered; index == code.
    const ALL: [Self; 18] = [
        Self::Ai1,
        Self::Ai2,
        Self::Ai3,
        Self::Ai4,
        Self::Ai5,
        Self::Ai6,
        Self::Ai7,
        Self::Ai8,
        Self::Ai9,
        Self::Ai10,
        Self::Ai11,
        Self::Ai12,
        Self::DiffAi1Ai2,
        Self::DiffAi3Ai4,
        Self::DiffAi5Ai6,
        Self::DiffAi7Ai8,
        Self::DiffAi9Ai10,
        Self::DiffAi11Ai12,
    ];

    pub const fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(code as usize).copied()
    }

    pub const fn is_differential(self) -> bool {
        self as u8 >= Self::DiffAi1Ai2 as u8
    }
}

// --- Data rates ---

/// Conversion data-rate codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum DataRate {
    Sps1 = 0x00,
    Sps3 = 0x01,
    Sps5 = 0x02,
    Sps10 = 0x03,
    Sps13 = 0x04,
    Sps15 = 0x05,
    Sps50 = 0x06,
    Sps60 = 0x07,
    Sps150 = 0x08,
    Sps300 = 0x09,
    Sps900 = 0x0A,
    Sps1800 = 0x0B,
    Sps2880 = 0x0C,
    Sps5760 = 0x0D,
    Sps11520 = 0x0E,
    #[default]
    Sps23040 = 0x0F,
}

impl DataRate {
    /// All rate codes, ordered; index == code.
    const ALL: [Self; 16] = [
        Self::Sps1,
        Self::Sps3,
        Self::Sps5,
        Self::Sps10,
        Self::Sps13,
        Self::Sps15,
        Self::Sps50,
        Self::Sps60,
        Self::Sps150,
        Self::Sps300,
        Self::Sps900,
        Self::Sps1800,
        Self::Sps2880,
        Self::Sps5760,
        Self::Sps11520,
        Self::Sps23040,
    ];

    pub const fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(code as usize).copied()
    }

    /// Nominal samples per second, for logs.
    pub const fn sps(self) -> u32 {
        match self {
            Self::Sps1 => 1,
            Self::Sps3 => 3,
            Self::Sps5 => 5,
            Self::Sps10 => 10,
            Self::Sps13 => 13,
            Self::Sps15 => 15,
            Self::Sps50 => 50,
            Self::Sps60 => 60,
            Self::Sps150 => 150,
            Self::Sps300 => 300,
            Self::Sps900 => 900,
            Self::Sps1800 => 1800,
            Self::Sps2880 => 2880,
            Self::Sps5760 => 5760,
            Self::Sps11520 => 11520,
            Self::Sps23040 => 23040,
        }
    }
}

// --- Conversion modes ---

/// Conversion scheduling mode, written to `DCHNL_CTRL1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum ConversionMode {
    Continuous = 0x00,
    #[default]
    SingleCycle = 0x02,
    ContinuousSingleCycle = 0x03,
}

impl ConversionMode {
    pub const fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0x00 => Some(Self::Continuous),
            0x02 => Some(Self::SingleCycle),
            0x03 => Some(Self::ContinuousSingleCycle),
            _ => None,
        }
    }
}

// --- Register word builders ---

/// `GEN_CHNL_CTRL` payload: channel code in bits 15:8, test flags in 23:16.
pub const fn channel_control_word(ch: Channel) -> u32 {
    ((ch as u32) << 8) | ((TEST_FLAGS as u32) << 16)
}

/// `DCHNL_CMD` payload starting a conversion at `rate`.
pub const fn start_command_word(rate: DataRate) -> u32 {
    ((START_CONVERSION | rate.code()) as u32) << 16
}

/// `DCHNL_CMD` payload stopping the current conversion.
pub const STOP_COMMAND_WORD: u32 = (STOP_CONVERSION as u32) << 16;

/// `DCHNL_CTRL1` payload selecting a conversion mode.
pub const fn mode_control_word(mode: ConversionMode) -> u32 {
    (mode as u32) << 16
}
