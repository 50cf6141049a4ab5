//! CRC-16/CCITT frame check
//!
//! Polynomial 0x1021, initial value 0xFFFF, MSB first, no final XOR
//! (the "CCITT-FALSE" variant). A frame is the data followed by its CRC in
//! big-endian order; the CRC over a whole intact frame is zero.

/// Generator polynomial x^16 + x^12 + x^5 + 1
pub const POLY: u16 = 0x1021;
/// Register preset
pub const INIT: u16 = 0xFFFF;

/// CRC of `data`
pub fn crc16_ccitt(data: &[u8]) -> u16 {
    data.iter().fold(INIT, |mut crc, &byte| {
        crc ^= (byte as u16) << 8;
        for _ in 0..8 {
            crc = if crc & 0x8000 != 0 {
                (crc << 1) ^ POLY
            } else {
                crc << 1
            };
        }
        crc
    })
}

/// Data with its CRC appended, high byte first
pub fn append_crc(data: &[u8]) -> Vec<u8> {
    let crc = crc16_ccitt(data);
    let mut frame = Vec::with_capacity(data.len() + 2);
    frame.extend_from_slice(data);
    frame.extend_from_slice(&crc.to_be_bytes());
    frame
}

/// Whether a frame built by [`append_crc`] arrived intact
pub fn verify_frame(frame: &[u8]) -> bool {
    frame.len() >= 2 && crc16_ccitt(frame) == 0
}

/// Print the intact/corrupted walkthrough for `message`
pub fn run(message: &str, corrupt_index: usize) -> anyhow::Result<()> {
    let data = message.as_bytes();
    let checksum = crc16_ccitt(data);

    println!("--- CRC-CCITT (16-bit) ---\n");
    println!("Original Message: \"{}\" (Length: {} bytes)", message, data.len());
    println!("Calculated CRC Checksum: 0x{:04X}\n", checksum);

    let mut frame = append_crc(data);
    println!("Full Frame Size (Data + CRC): {} bytes", frame.len());

    println!("\n[Scenario A: Data is intact]");
    report(&frame);

    if corrupt_index >= frame.len() {
        anyhow::bail!(
            "corrupt index {} is outside the {}-byte frame",
            corrupt_index,
            frame.len()
        );
    }
    println!("\n[Scenario B: Data is corrupted]");
    frame[corrupt_index] ^= 0x01;
    println!("Corruption: Flipped a bit in byte index {}.", corrupt_index);
    report(&frame);

    Ok(())
}

fn report(frame: &[u8]) {
    if verify_frame(frame) {
        println!("Verification Status: PASS (CRC of frame is 0x0000)");
    } else {
        println!(
            "Verification Status: FAIL (CRC of frame is 0x{:04X}). Error detected.",
            crc16_ccitt(frame)
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_value() {
        assert_eq!(crc16_ccitt(b"123456789"), 0x29B1);
        assert_eq!(crc16_ccitt(b""), INIT);
    }

    #[test]
    fn intact_frame_verifies() {
        let frame = append_crc(b"Hello, CRC-CCITT!");
        assert_eq!(frame.len(), 19);
        assert!(verify_frame(&frame));
    }

    #[test]
    fn single_bit_flip_is_detected() {
        let mut frame = append_crc(b"Hello, CRC-CCITT!");
        for index in 0..frame.len() {
            frame[index] ^= 0x01;
            assert!(!verify_frame(&frame), "flip at {} went unnoticed", index);
            frame[index] ^= 0x01;
        }
    }

    #[test]
    fn too_short_to_be_a_frame() {
        assert!(!verify_frame(&[0x00]));
    }
}
