//! Conversions from millisecond/8-bit inputs to the KTD2026's register
//! encodings. These are pure functions so they can be unit tested without
//! any bus in the loop.

/// Convert a flash period in milliseconds to the closest of the chip's 127
/// period steps. Steps are nominally 128 ms apart, but step 0 covers up to
/// 256 ms and step 1 starts at 384 ms, so there is a 256 ms gap at the
/// bottom of the range. Step 127 would select a non-repeating flash and is
/// never produced here. Inputs outside [128, 16384] ms are clamped.
/// Ref datasheet p.14.
pub fn convert_flash_period(period_ms: u16) -> u8 {
    if period_ms > 16384 {
        return 126;
    }
    if period_ms < 256 {
        return 0;
    }
    if period_ms < 448 {
        return 1;
    }
    let adj = period_ms - 384;
    let rem = (adj & 0x7F) as u8;
    let steps = (adj >> 7) as u8;
    if rem & 0x40 != 0 {
        // upper half of the 128 ms window, round up
        steps + 2
    } else {
        steps + 1
    }
}

/// Convert ramp-up/ramp-down times in milliseconds to the chip's Trise,
/// Tfall and ramp-scale encoding. The chip supports [16, 7680] ms via a
/// scale setting shared by both ramps, so this picks the scale that best
/// approximates both inputs together. The low 8 bits of the result are the
/// Reg5 contents (Tfall in 7:4, Trise in 3:0); bits 9:8 are the scale for
/// Reg0[6:5]. Ref datasheet p.15.
pub fn convert_ramp_time(up: u16, down: u16) -> u16 {
    // Both zero means leave the device at its default ramp.
    if up == 0 && down == 0 {
        return 0;
    }

    let up = up.min(7680);
    let down = down.min(7680);

    let mut interval = 128u16;
    let mut scale = 0b00u16;
    if up > 3840 || down > 3840 {
        // 4x slower
        interval = 512;
        scale = 0b10;
    } else if up > 1920 || down > 1920 {
        // 2x slower
        interval = 256;
        scale = 0b01;
    }
    // 8x faster. Allow rounding down to 240 here; rounding up to 256 would
    // land in the 1x band instead.
    if up < 248 && down < 248 {
        interval = 16;
        scale = 0b11;
    }

    // Floor each ramp at one step of the chosen interval.
    let up = up.max(interval);
    let down = down.max(interval);

    let mut tfall = down / interval;
    if down % interval >= interval >> 1 {
        tfall += 1;
    }
    let mut trise = up / interval;
    if up % interval > interval >> 1 {
        trise += 1;
    }
    (scale << 8) | (tfall << 4) | trise
}

/// Convert an 8-bit color value to the brightness register's range. The
/// register maxes out at 192 and ignores 193-255, so scale by 0.75, with
/// full-scale input mapping exactly to full-scale output.
pub fn convert_color(color: u8) -> u8 {
    if color == 255 {
        return 192;
    }
    ((color as u16 * 3) >> 2) as u8
}
