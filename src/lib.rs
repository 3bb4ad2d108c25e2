//! This Rust `embedded-hal`-based library is a simple way to control the Kinetic
//! KTD2026/KTD2027 RGB LED driver. The KTD2026 drives three LED channels (the
//! KTD2027 adds a fourth) with per-channel current control, a hardware flash
//! timer, and programmable ramp up/down, all over I2C. This driver is designed
//! for the `no_std` environment, so it can be used in embedded systems.
//! ## Usage
//! Add this to your `Cargo.toml`:
//! ```toml
//! [dependencies]
//! ktd2026 = "0.1"
//! ```
//! Then to create a new driver:
//! ```rust
//! use ktd2026::{I2cBus, Ktd2026Driver};
//!
//! // board setup
//! let i2c = ...; // I2C peripheral
//!
//! // create and initialize the driver
//! let mut driver = Ktd2026Driver::new(I2cBus::new(i2c));
//! if let Err(e) = driver.begin() {
//!     panic!("Error initializing KTD2026 driver: {:?}", e);
//! }
//! ```
//! The driver is generic over the [`RegisterBus`] trait, so a transport other
//! than `embedded-hal` I2C can be used by implementing its two methods.
//! ## Features
//! ### Solid color
//! Set the four channel brightnesses from 8-bit color components, then switch
//! the channels on:
//! ```rust
//! driver.set_color(255, 64, 0, 0)?.turn_on()?;
//! // or with a 24-bit hex code (the fourth channel rides in bits 31:24)
//! driver.set_color_hex(0xFF4000)?.turn_on()?;
//! ```
//! ### Blinking
//! The chip flashes the LED on its own once configured; no further bus traffic
//! is needed. Period, duty cycle, and ramp up/down times are all programmable:
//! ```rust
//! driver.set_ramp(RampShape::Linear)?
//!     .set_color_hex(0x4080C0)?
//!     .blink_on(1024, 64, 16, 128)?;
//! ```
//! ### Function chaining
//! The driver functions return a `Result` that contains the driver reference in
//! the `Ok` value. This can be chained together to make the code more readable.
//! ```rust
//! driver.set_ramp(RampShape::SCurve)?
//!     .set_color(0, 128, 255, 0)?
//!     .blink_on(2048, 128, 256, 256)?;
//! ```
//! ## License
//! This library is licensed under the MIT license.

#![no_std]
#![allow(clippy::unusual_byte_groupings)]

use embedded_hal::i2c;

mod convert;
pub use convert::{convert_color, convert_flash_period, convert_ramp_time};

// Registers
const REGISTER_CONTROL: u8 = 0x00;
const REGISTER_FLASH_PERIOD: u8 = 0x01;
const REGISTER_FLASH_ON_TIME1: u8 = 0x02;
const REGISTER_CHANNEL_CONTROL: u8 = 0x04;
const REGISTER_RAMP_RATE: u8 = 0x05;
const REGISTER_BRIGHTNESS_BASE: u8 = 0x06;

const REGISTER_COUNT: usize = 10;

// Power-on values for all 10 registers, written in order during `begin` to
// put the device in a known state.
const DEFAULT_REGISTERS: [u8; REGISTER_COUNT] = [
    // [7]   Factory test - must be 0
    // [6:5] Ramp time scaling
    // [4:3] Power control
    // [2:0] Reset control
    0b00011000,
    // [7]   Ramp shape - 0=s-curve, 1=linear
    // [6:0] Flash period
    0b00000000,
    // Flash timer 1
    0b10000000,
    // Flash timer 2
    0b10000000,
    // [7:6] D4 channel setting (unused on the KTD2026)
    // [5:4] D3 channel setting
    // [3:2] D2 channel setting
    // [1:0] D1 channel setting
    0b00000000,
    // [7:4] Tfall
    // [3:0] Trise
    0b00000000,
    // D1 max brightness
    0b00000000,
    // D2 max brightness
    0b00000000,
    // D3 max brightness
    0b00000000,
    // D4 max brightness (unused on the KTD2026)
    0b00000000,
];

// Channel-control register values, one 2-bit mode replicated across all four
// channel slots.
const CHANNEL_CONTROL_ALL_ON: u8 = 0x55;
const CHANNEL_CONTROL_ALL_OFF: u8 = 0x00;
const CHANNEL_CONTROL_ALL_PWM1: u8 = 0xAA;

// Register 1 bit fields
const RAMP_SHAPE_MASK: u8 = 0b1000_0000;
const FLASH_PERIOD_MASK: u8 = 0b0111_1111;

// Register 0: everything except the ramp-scale field in bits 6:5
const CONTROL_KEEP_MASK: u8 = 0b1001_1111;
const RAMP_SCALE_SHIFT: u8 = 5;

/// Shape of the brightness ramp around each flash cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RampShape {
    SCurve = 0,
    Linear = 1,
}

/// One of the chip's physical LED drive outputs. D4 only exists on the
/// KTD2027.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    D1 = 0,
    D2 = 1,
    D3 = 2,
    D4 = 3,
}

/// Mapping from logical color to the physical channel it is wired to. The
/// default matches the usual layout of R on D1, G on D2, B on D3, and the
/// white/fourth channel on D4; pass a custom map to
/// [`Ktd2026Driver::new_with_channel_map`] if your board differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelMap {
    pub red: Channel,
    pub green: Channel,
    pub blue: Channel,
    pub white: Channel,
}

impl Default for ChannelMap {
    fn default() -> Self {
        Self {
            red: Channel::D1,
            green: Channel::D2,
            blue: Channel::D3,
            white: Channel::D4,
        }
    }
}

/// The transport the driver writes registers through. Implemented by
/// [`I2cBus`] for `embedded-hal` I2C peripherals; implement it yourself to
/// drive the chip over some other register-write mechanism.
pub trait RegisterBus {
    type Error;

    /// Perform whatever setup the transport needs and report readiness.
    fn begin(&mut self) -> Result<(), Self::Error>;

    /// Write one byte to one device register. Indices 0-9 are valid.
    fn reg_write(&mut self, index: u8, value: u8) -> Result<(), Self::Error>;
}

/// Errors generated by the KTD2026 driver
#[derive(Debug, PartialEq, Eq)]
pub enum Ktd2026Error<E> {
    /// A mutating operation was attempted before a successful `begin`
    NotInitialized,
    /// The underlying bus reported a transaction failure
    Bus(E),
}

#[cfg(feature = "defmt")]
impl<E> defmt::Format for Ktd2026Error<E> {
    fn format(&self, fmt: defmt::Formatter) {
        let msg = match self {
            Ktd2026Error::NotInitialized => "not initialized",
            Ktd2026Error::Bus(_) => "bus error",
        };
        defmt::write!(fmt, "{}", msg);
    }
}

#[cfg(feature = "ufmt")]
impl<E> ufmt::uDisplay for Ktd2026Error<E> {
    fn fmt<W>(&self, w: &mut ufmt::Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: ufmt::uWrite + ?Sized,
    {
        let msg = match self {
            Ktd2026Error::NotInitialized => "not initialized",
            Ktd2026Error::Bus(_) => "bus error",
        };
        ufmt::uwrite!(w, "{}", msg)
    }
}

/// [`RegisterBus`] implementation over an `embedded-hal` I2C peripheral.
pub struct I2cBus<I2C> {
    i2c: I2C,
    address: u8,
}

impl<I2C> I2cBus<I2C>
where
    I2C: i2c::I2c,
{
    /// Default address for the KTD2026/KTD2027.
    pub fn default_address() -> u8 {
        0x30
    }

    /// Create a new bus with the default address (0x30)
    pub fn new(i2c: I2C) -> Self {
        Self::new_with_address(i2c, Self::default_address())
    }

    /// Create a new bus with a specific address. The address is fixed per
    /// part variant:
    /// - 0x30 for the KTD2026/KTD2027
    /// - 0x31 for the KTD2026B/KTD2027B
    /// - 0x32 for the KTD2026C/KTD2027C
    pub fn new_with_address(i2c: I2C, address: u8) -> Self {
        Self { i2c, address }
    }

    /// Get a mutable reference to the I2C peripheral used by the bus
    pub fn i2c(&mut self) -> &mut I2C {
        &mut self.i2c
    }
}

impl<I2C> RegisterBus for I2cBus<I2C>
where
    I2C: i2c::I2c,
{
    type Error = I2C::Error;

    fn begin(&mut self) -> Result<(), Self::Error> {
        // Empty write probes for an ACK at the device address.
        self.i2c.write(self.address, &[])
    }

    fn reg_write(&mut self, index: u8, value: u8) -> Result<(), Self::Error> {
        self.i2c.write(self.address, &[index, value])
    }
}

/// Driver for one KTD2026/KTD2027 device.
///
/// Holds a write-through cache of the 10 device registers so read-modify-write
/// operations never need to read from the device. A cache slot is only updated
/// after the bus confirms the corresponding write, so on a partial failure the
/// cache still matches what actually reached the chip.
pub struct Ktd2026Driver<B>
where
    B: RegisterBus,
{
    bus: B,
    channels: ChannelMap,
    reg_cache: [u8; REGISTER_COUNT],
    inited: bool,
}

impl<B> Ktd2026Driver<B>
where
    B: RegisterBus,
{
    /// Create a new KTD2026 driver with the default channel mapping
    pub fn new(bus: B) -> Self {
        Self::new_with_channel_map(bus, ChannelMap::default())
    }

    /// Create a new KTD2026 driver with a board-specific channel mapping
    pub fn new_with_channel_map(bus: B, channels: ChannelMap) -> Self {
        Self {
            bus,
            channels,
            reg_cache: [0; REGISTER_COUNT],
            inited: false,
        }
    }

    /// Get a mutable reference to the bus used by the driver
    pub fn bus(&mut self) -> &mut B {
        &mut self.bus
    }

    /// Initialize the KTD2026 driver. Starts the bus, then writes all 10
    /// registers to their power-on defaults to establish a known ground
    /// state. Every other operation fails with
    /// [`Ktd2026Error::NotInitialized`] until this succeeds.
    ///
    /// On failure the driver stays uninitialized, but registers written
    /// before the failing one have reached the device and stay reflected in
    /// the cache; there is no rollback.
    pub fn begin(&mut self) -> Result<&mut Self, Ktd2026Error<B::Error>> {
        self.bus.begin().map_err(Ktd2026Error::Bus)?;

        for (index, &value) in DEFAULT_REGISTERS.iter().enumerate() {
            self.write_reg(index as u8, value)?;
        }
        self.inited = true;
        #[cfg(feature = "defmt")]
        defmt::debug!("KTD2026: initialized");
        Ok(self)
    }

    /// Set the ramp up/down shape. Leaves the flash period bits of the
    /// register untouched.
    pub fn set_ramp(&mut self, shape: RampShape) -> Result<&mut Self, Ktd2026Error<B::Error>> {
        self.check_inited()?;
        let reg1 = (self.reg_cache[1] & FLASH_PERIOD_MASK) | ((shape as u8) << 7);
        self.write_reg(REGISTER_FLASH_PERIOD, reg1)?;
        Ok(self)
    }

    /// Set the LED color. Each component is scaled to the brightness
    /// register's 0-192 range and written to the channel it is mapped to.
    /// All four writes are attempted even if an earlier one fails; the first
    /// error is returned, and whatever was written stays written.
    pub fn set_color(
        &mut self,
        r: u8,
        g: u8,
        b: u8,
        k: u8,
    ) -> Result<&mut Self, Ktd2026Error<B::Error>> {
        self.check_inited()?;
        let map = self.channels;
        let writes = [
            (map.red, convert_color(r)),
            (map.green, convert_color(g)),
            (map.blue, convert_color(b)),
            (map.white, convert_color(k)),
        ];
        let mut result = Ok(());
        for (channel, value) in writes {
            result = result.and(self.write_reg(REGISTER_BRIGHTNESS_BASE + channel as u8, value));
        }
        result?;
        Ok(self)
    }

    /// Set the LED color with a hex code, in KRGB order. The fourth channel
    /// sits in the high byte so plain RGB colors can be passed as a standard
    /// 24-bit hex code.
    pub fn set_color_hex(&mut self, color: u32) -> Result<&mut Self, Ktd2026Error<B::Error>> {
        self.set_color(
            ((color >> 16) & 0xFF) as u8,
            ((color >> 8) & 0xFF) as u8,
            (color & 0xFF) as u8,
            (color >> 24) as u8,
        )
    }

    /// Turn the LED on, with all channels driven continuously at their
    /// current brightness.
    pub fn turn_on(&mut self) -> Result<&mut Self, Ktd2026Error<B::Error>> {
        self.check_inited()?;
        self.write_reg(REGISTER_CHANNEL_CONTROL, CHANNEL_CONTROL_ALL_ON)?;
        Ok(self)
    }

    /// Turn the LED off.
    pub fn turn_off(&mut self) -> Result<&mut Self, Ktd2026Error<B::Error>> {
        self.check_inited()?;
        self.write_reg(REGISTER_CHANNEL_CONTROL, CHANNEL_CONTROL_ALL_OFF)?;
        Ok(self)
    }

    /// Blink the LED with the given settings. The chip runs the flash timer
    /// itself once configured.
    /// - `period_ms` - full cycle period. Valid range [128-16384] ms.
    /// - `duty_cycle` - amount of time the LED is on during the period, 0-255.
    /// - `ramp_up_ms` - time to ramp to full brightness. Counts as part of
    ///   the duty cycle. Valid range [16-7680] ms.
    /// - `ramp_down_ms` - time to dim to off. Does not count as part of the
    ///   duty cycle. Valid range [16-7680] ms.
    ///
    /// All five register writes are attempted even if an earlier one fails;
    /// the first error is returned.
    pub fn blink_on(
        &mut self,
        period_ms: u16,
        duty_cycle: u8,
        ramp_up_ms: u16,
        ramp_down_ms: u16,
    ) -> Result<&mut Self, Ktd2026Error<B::Error>> {
        self.check_inited()?;

        // Configure the flash cycle, keeping the ramp-shape bit as is.
        let reg1 = (self.reg_cache[1] & RAMP_SHAPE_MASK) | convert_flash_period(period_ms);
        let ramp = convert_ramp_time(ramp_up_ms, ramp_down_ms);
        // Ramp scale comes from bits 9:8 of the combined ramp encoding.
        let reg0 =
            (self.reg_cache[0] & CONTROL_KEEP_MASK) | (((ramp >> 8) as u8) << RAMP_SCALE_SHIFT);

        let mut result = Ok(());
        result = result.and(self.write_reg(REGISTER_CONTROL, reg0));
        result = result.and(self.write_reg(REGISTER_FLASH_PERIOD, reg1));
        result = result.and(self.write_reg(REGISTER_FLASH_ON_TIME1, duty_cycle));
        result = result.and(self.write_reg(REGISTER_RAMP_RATE, ramp as u8));

        // Switch all channels to the flash timer.
        result = result.and(self.write_reg(REGISTER_CHANNEL_CONTROL, CHANNEL_CONTROL_ALL_PWM1));

        result?;
        Ok(self)
    }

    fn check_inited(&self) -> Result<(), Ktd2026Error<B::Error>> {
        if self.inited {
            Ok(())
        } else {
            Err(Ktd2026Error::NotInitialized)
        }
    }

    /// Write one register and, only on success, mirror the value in the
    /// cache. Private method.
    fn write_reg(&mut self, index: u8, value: u8) -> Result<(), Ktd2026Error<B::Error>> {
        debug_assert!((index as usize) < REGISTER_COUNT);
        self.bus.reg_write(index, value).map_err(Ktd2026Error::Bus)?;
        self.reg_cache[index as usize] = value;
        Ok(())
    }

    #[cfg(test)]
    fn cached_register(&self, index: usize) -> u8 {
        self.reg_cache[index]
    }
}
