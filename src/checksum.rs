/// One's-complement Internet checksum (RFC 1071).
///
/// The buffer is summed as big-endian 16-bit words. An odd trailing byte is
/// padded with a zero low byte. Carries are folded back twice before the
/// final complement.
pub fn checksum(data: &[u8]) -> u16 {
    let mut sum = 0u32;

    let mut words = data.chunks_exact(2);
    for word in &mut words {
        sum = sum.wrapping_add(u32::from(u16::from_be_bytes([word[0], word[1]])));
    }
    if let [last] = words.remainder() {
        sum = sum.wrapping_add(u32::from(*last) << 8);
    }

    sum = (sum >> 16) + (sum & 0xffff);
    sum += sum >> 16;

    !(sum as u16)
}
