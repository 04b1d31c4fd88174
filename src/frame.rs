//! Read-only views of the IEEE 802.11 header fields consumed by CCMP.
//!
//! Multi-byte header fields are little-endian on the wire. The types here
//! keep them as host integers and only serialize back to little-endian when
//! the AAD is assembled.

/// A 48-bit IEEE 802.11 MAC address.
pub type MacAddr = [u8; 6];

/// The frame type encoded in bits 2..3 of the Frame Control field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameType {
    Management,
    Control,
    Data,
    Extension,
}

/// The Frame Control field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameControl(pub u16);

impl FrameControl {
    pub const PROTOCOL_VERSION_MASK: u16 = 0x0003;
    pub const TYPE_MASK: u16 = 0x000c;
    pub const SUBTYPE_MASK: u16 = 0x00f0;
    pub const TO_DS: u16 = 0x0100;
    pub const FROM_DS: u16 = 0x0200;
    pub const MORE_FRAGMENTS: u16 = 0x0400;
    pub const RETRY: u16 = 0x0800;
    pub const PWR_MGMT: u16 = 0x1000;
    pub const MORE_DATA: u16 = 0x2000;
    pub const PROTECTED: u16 = 0x4000;
    pub const ORDER: u16 = 0x8000;

    /// Bit 3 of the subtype marks QoS data subtypes.
    pub const QOS_SUBTYPE_BIT: u8 = 0x08;

    pub fn from_le_bytes(bytes: [u8; 2]) -> Self {
        Self(u16::from_le_bytes(bytes))
    }

    pub fn to_le_bytes(self) -> [u8; 2] {
        self.0.to_le_bytes()
    }

    /// Return the frame type.
    pub fn frame_type(self) -> FrameType {
        match (self.0 & Self::TYPE_MASK) >> 2 {
            0 => FrameType::Management,
            1 => FrameType::Control,
            2 => FrameType::Data,
            _ => FrameType::Extension,
        }
    }

    /// Return the 4-bit subtype.
    pub fn subtype(self) -> u8 {
        ((self.0 & Self::SUBTYPE_MASK) >> 4) as u8
    }

    pub fn to_ds(self) -> bool {
        self.0 & Self::TO_DS != 0
    }

    pub fn from_ds(self) -> bool {
        self.0 & Self::FROM_DS != 0
    }

    pub fn retry(self) -> bool {
        self.0 & Self::RETRY != 0
    }

    pub fn protected(self) -> bool {
        self.0 & Self::PROTECTED != 0
    }

    /// Returns `true` for data frames with a QoS subtype.
    pub fn is_qos_data(self) -> bool {
        self.frame_type() == FrameType::Data && self.subtype() & Self::QOS_SUBTYPE_BIT != 0
    }

    /// Returns `true` when both ToDS and FromDS are set, i.e. the header
    /// carries a fourth address.
    pub fn has_addr4(self) -> bool {
        self.to_ds() && self.from_ds()
    }
}

/// The Sequence Control field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SequenceControl(pub u16);

impl SequenceControl {
    pub const FRAGMENT_MASK: u16 = 0x000f;
    pub const SEQUENCE_MASK: u16 = 0xfff0;

    pub fn new(sequence_number: u16, fragment_number: u8) -> Self {
        Self((sequence_number << 4) | (u16::from(fragment_number) & Self::FRAGMENT_MASK))
    }

    pub fn from_le_bytes(bytes: [u8; 2]) -> Self {
        Self(u16::from_le_bytes(bytes))
    }

    pub fn sequence_number(self) -> u16 {
        (self.0 & Self::SEQUENCE_MASK) >> 4
    }

    pub fn fragment_number(self) -> u8 {
        (self.0 & Self::FRAGMENT_MASK) as u8
    }
}

/// The QoS Control field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QosControl(pub u16);

impl QosControl {
    pub const TID_MASK: u16 = 0x000f;
    pub const AMSDU_PRESENT: u16 = 0x0080;

    pub fn from_le_bytes(bytes: [u8; 2]) -> Self {
        Self(u16::from_le_bytes(bytes))
    }

    pub fn to_le_bytes(self) -> [u8; 2] {
        self.0.to_le_bytes()
    }

    /// Return the traffic identifier.
    pub fn tid(self) -> u8 {
        (self.0 & Self::TID_MASK) as u8
    }

    pub fn amsdu_present(self) -> bool {
        self.0 & Self::AMSDU_PRESENT != 0
    }
}

/// The fixed IEEE 802.11 MAC header fields read while deriving the CCMP
/// AAD and nonce.
///
/// Which optional fields take part is decided by the Frame Control field:
/// `addr4` only when ToDS and FromDS are both set, `qos_ctrl` only for QoS
/// data subtypes. Keeping them consistent with the Frame Control field is up
/// to whoever parsed the header; a missing field reads as zero.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MacHeader {
    pub frame_control: FrameControl,
    pub addr1: MacAddr,
    pub addr2: MacAddr,
    pub addr3: MacAddr,
    pub seq_ctrl: SequenceControl,
    pub addr4: Option<MacAddr>,
    pub qos_ctrl: Option<QosControl>,
}

impl MacHeader {
    pub fn is_data(&self) -> bool {
        self.frame_control.frame_type() == FrameType::Data
    }

    pub fn is_mgmt(&self) -> bool {
        self.frame_control.frame_type() == FrameType::Management
    }

    pub fn is_qos_data(&self) -> bool {
        self.frame_control.is_qos_data()
    }

    pub fn has_addr4(&self) -> bool {
        self.frame_control.has_addr4()
    }
}

/// The 48-bit CCMP packet number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct PacketNumber(u64);

impl PacketNumber {
    pub const MAX: u64 = (1 << 48) - 1;

    /// Creates a packet number, keeping the low 48 bits of `value`.
    pub fn new(value: u64) -> Self {
        Self(value & Self::MAX)
    }

    pub fn value(self) -> u64 {
        self.0
    }

    /// PN5 first, PN0 last: the order used in the CCM nonce.
    pub fn to_nonce_bytes(self) -> [u8; 6] {
        let be = self.0.to_be_bytes();
        [be[2], be[3], be[4], be[5], be[6], be[7]]
    }
}

/// The 8-byte CCMP header that precedes the encrypted payload.
///
/// ```text
/// | PN0 | PN1 | rsvd | key id / ExtIV | PN2 | PN3 | PN4 | PN5 |
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CcmpHeader([u8; CcmpHeader::LEN]);

impl CcmpHeader {
    pub const LEN: usize = 8;

    const EXT_IV: u8 = 0x20;

    pub fn new(bytes: [u8; Self::LEN]) -> Self {
        Self(bytes)
    }

    /// Builds the header carrying `pn` with the ExtIV bit set.
    pub fn with_packet_number(pn: PacketNumber, key_id: u8) -> Self {
        let le = pn.value().to_le_bytes();
        Self([
            le[0],
            le[1],
            0,
            Self::EXT_IV | ((key_id & 0x03) << 6),
            le[2],
            le[3],
            le[4],
            le[5],
        ])
    }

    pub fn as_bytes(&self) -> &[u8; Self::LEN] {
        &self.0
    }

    /// Return the packet number.
    pub fn packet_number(&self) -> PacketNumber {
        let b = &self.0;
        PacketNumber::new(u64::from_le_bytes([
            b[0], b[1], b[4], b[5], b[6], b[7], 0, 0,
        ]))
    }

    /// Return the key identifier (0..=3).
    pub fn key_id(&self) -> u8 {
        self.0[3] >> 6
    }

    /// Returns `true` when the Extended IV bit is set.
    pub fn ext_iv(&self) -> bool {
        self.0[3] & Self::EXT_IV != 0
    }
}

#[cfg(test)]
impl MacHeader {
    /// Reads the fixed header fields out of a raw 802.11 header.
    pub(crate) fn from_bytes(bytes: &[u8]) -> Self {
        let frame_control = FrameControl::from_le_bytes([bytes[0], bytes[1]]);
        let addr = |at: usize| -> MacAddr { bytes[at..at + 6].try_into().unwrap() };
        let mut pos = 24;
        let addr4 = if frame_control.has_addr4() {
            pos += 6;
            Some(addr(24))
        } else {
            None
        };
        let qos_ctrl = if frame_control.is_qos_data() {
            Some(QosControl::from_le_bytes([bytes[pos], bytes[pos + 1]]))
        } else {
            None
        };
        Self {
            frame_control,
            addr1: addr(4),
            addr2: addr(10),
            addr3: addr(16),
            seq_ctrl: SequenceControl::from_le_bytes([bytes[22], bytes[23]]),
            addr4,
            qos_ctrl,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_control_fields() {
        // Protected data frame, retry set
        let fc = FrameControl::from_le_bytes([0x08, 0x48]);
        assert_eq!(fc.frame_type(), FrameType::Data);
        assert_eq!(fc.subtype(), 0);
        assert!(fc.retry());
        assert!(fc.protected());
        assert!(!fc.is_qos_data());
        assert!(!fc.has_addr4());

        // QoS data, ToDS | FromDS
        let fc = FrameControl::from_le_bytes([0x88, 0x03]);
        assert!(fc.is_qos_data());
        assert!(fc.has_addr4());

        // Action frame
        let fc = FrameControl::from_le_bytes([0xd0, 0x40]);
        assert_eq!(fc.frame_type(), FrameType::Management);
        assert_eq!(fc.subtype(), 0x0d);
        // The QoS subtype bit only means QoS for data frames
        assert!(!fc.is_qos_data());
    }

    #[test]
    fn sequence_control_fields() {
        let seq = SequenceControl::from_le_bytes([0x53, 0x12]);
        assert_eq!(seq.sequence_number(), 0x125);
        assert_eq!(seq.fragment_number(), 3);
        assert_eq!(SequenceControl::new(0x125, 3), seq);
    }

    #[test]
    fn qos_control_fields() {
        let qos = QosControl::from_le_bytes([0x85, 0x00]);
        assert_eq!(qos.tid(), 5);
        assert!(qos.amsdu_present());
    }

    #[test]
    fn packet_number_byte_order() {
        let hdr = CcmpHeader::new([0x0c, 0xe7, 0x00, 0x20, 0x76, 0x97, 0x03, 0xb5]);
        let pn = hdr.packet_number();
        assert_eq!(pn.value(), 0xb503_9776_e70c);
        assert_eq!(pn.to_nonce_bytes(), [0xb5, 0x03, 0x97, 0x76, 0xe7, 0x0c]);
        assert!(hdr.ext_iv());
        assert_eq!(hdr.key_id(), 0);
    }

    #[test]
    fn ccmp_header_from_packet_number() {
        let hdr = CcmpHeader::with_packet_number(PacketNumber::new(0xb503_9776_e70c), 2);
        assert_eq!(
            hdr.as_bytes(),
            &[0x0c, 0xe7, 0x00, 0xa0, 0x76, 0x97, 0x03, 0xb5]
        );
        assert_eq!(hdr.key_id(), 2);
        assert_eq!(hdr.packet_number().value(), 0xb503_9776_e70c);
    }

    #[test]
    fn packet_number_is_48_bits() {
        assert_eq!(PacketNumber::new(u64::MAX).value(), PacketNumber::MAX);
    }

    #[test]
    fn header_from_raw_bytes() {
        let raw = hex!(
            "8843 0000 020000000001 020000000002 020000000003 a000
             020000000004 0300"
        );
        let hdr = MacHeader::from_bytes(&raw);
        assert!(hdr.is_data());
        assert!(hdr.is_qos_data());
        assert_eq!(hdr.addr4, Some([0x02, 0, 0, 0, 0, 0x04]));
        assert_eq!(hdr.qos_ctrl, Some(QosControl(0x0003)));
        assert_eq!(hdr.seq_ctrl.sequence_number(), 0x00a);
    }
}
