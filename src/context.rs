//! CCMP header context: the AAD and nonce derived from the MAC header.

use crate::frame::{
    CcmpHeader, FrameControl, FrameType, MacHeader, QosControl, SequenceControl,
};
use crate::utils::log::Hex;

/// Length of the CCM nonce in bytes.
pub const NONCE_LEN: usize = 13;
/// Length of the big-endian AAD length prefix.
const AAD_LEN_PREFIX: usize = 2;
/// Longest AAD body: FC, 3 addresses, sequence control, address 4, QoS.
pub const AAD_MAX_LEN: usize = 2 + 3 * 6 + 2 + 6 + 2;

/// Nonce flag marking a management frame.
const NONCE_MGMT_FLAG: u8 = 0x10;
/// Subtype bits 4..6 cleared in data frames; bit 7 (QoS) is left alone.
const FC_DATA_SUBTYPE_MASK: u16 = 0x0070;

/// Additional authenticated data for one frame.
///
/// The buffer holds the big-endian length prefix followed by the masked
/// header fields and is zero-filled to two AES blocks, which is exactly how
/// CBC-MAC consumes it.
#[derive(Clone, PartialEq, Eq)]
pub struct Aad {
    buf: [u8; AAD_LEN_PREFIX + AAD_MAX_LEN],
    len: usize,
}

impl Aad {
    fn new() -> Self {
        Aad {
            buf: [0u8; AAD_LEN_PREFIX + AAD_MAX_LEN],
            len: 0,
        }
    }

    fn push(&mut self, bytes: &[u8]) {
        let start = AAD_LEN_PREFIX + self.len;
        self.buf[start..start + bytes.len()].copy_from_slice(bytes);
        self.len += bytes.len();
    }

    fn seal(mut self) -> Self {
        self.buf[..AAD_LEN_PREFIX].copy_from_slice(&(self.len as u16).to_be_bytes());
        self
    }

    /// Length of the AAD, excluding the length prefix.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.len
    }

    /// The AAD bytes, excluding the length prefix.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[AAD_LEN_PREFIX..AAD_LEN_PREFIX + self.len]
    }

    /// Length prefix and AAD, zero-padded to a whole number of blocks.
    pub(crate) fn blocks(&self) -> &[u8] {
        &self.buf
    }
}

impl core::fmt::Debug for Aad {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Aad({})", Hex(self.as_bytes()))
    }
}

/// The 13-byte CCM nonce: priority/management flags, address 2, and the
/// packet number from PN5 down to PN0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Nonce(pub [u8; NONCE_LEN]);

impl Nonce {
    pub fn as_bytes(&self) -> &[u8; NONCE_LEN] {
        &self.0
    }

    /// The priority/flags byte.
    pub fn flags(&self) -> u8 {
        self.0[0]
    }
}

/// Normalizes the Frame Control field for the AAD.
///
/// Bits that may change on retransmission are cleared and the Protected
/// bit is forced on. Data frames lose their subtype bits 4..6; QoS data
/// frames also lose the Order bit.
fn masked_frame_control(fc: FrameControl) -> FrameControl {
    let mut bits = fc.0;
    if fc.frame_type() == FrameType::Data {
        bits &= !FC_DATA_SUBTYPE_MASK;
    }
    if fc.is_qos_data() {
        bits &= !FrameControl::ORDER;
    }
    bits &= !(FrameControl::RETRY | FrameControl::PWR_MGMT | FrameControl::MORE_DATA);
    bits |= FrameControl::PROTECTED;
    FrameControl(bits)
}

/// Keeps the fragment number, zeroes the sequence number.
fn masked_sequence_control(seq: SequenceControl) -> SequenceControl {
    SequenceControl(seq.0 & SequenceControl::FRAGMENT_MASK)
}

/// Keeps only the TID.
///
/// Bits 4..6 are always cleared; the A-MSDU present bit is cleared as well
/// since neither side is assumed to be SPP A-MSDU capable. The second byte
/// is zero.
fn masked_qos_control(qos: QosControl) -> QosControl {
    QosControl(qos.0 & QosControl::TID_MASK)
}

/// Derives the CCMP AAD and nonce for a frame.
///
/// `ccmp_header` is the first eight bytes of the protected frame body.
pub fn derive(header: &MacHeader, ccmp_header: &CcmpHeader) -> (Aad, Nonce) {
    let fc = header.frame_control;
    let addr4 = fc.has_addr4();
    let qos = fc.is_qos_data();
    let qos_ctrl = header.qos_ctrl.unwrap_or_default();

    let mut aad = Aad::new();
    aad.push(&masked_frame_control(fc).to_le_bytes());
    aad.push(&header.addr1);
    aad.push(&header.addr2);
    aad.push(&header.addr3);
    aad.push(&masked_sequence_control(header.seq_ctrl).0.to_le_bytes());
    if addr4 {
        aad.push(&header.addr4.unwrap_or_default());
    }
    if qos {
        aad.push(&masked_qos_control(qos_ctrl).to_le_bytes());
    }
    let aad = aad.seal();

    let mut nonce = [0u8; NONCE_LEN];
    nonce[0] = if header.is_mgmt() {
        NONCE_MGMT_FLAG
    } else if qos {
        qos_ctrl.tid()
    } else {
        0
    };
    nonce[1..7].copy_from_slice(&header.addr2);
    nonce[7..].copy_from_slice(&ccmp_header.packet_number().to_nonce_bytes());

    trace!("CCMP AAD: {}", Hex(aad.as_bytes()));
    trace!("CCMP nonce: {}", Hex(&nonce));

    (aad, Nonce(nonce))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::PacketNumber;

    // IEEE 802.11 CCMP test vector header (protected data frame, retry set)
    fn vector_header() -> MacHeader {
        MacHeader::from_bytes(&hex!(
            "0848c32c0fd2e128a57c5030f1844408abaea5b8fcba8033"
        ))
    }

    fn vector_ccmp_header() -> CcmpHeader {
        CcmpHeader::new(hex!("0ce70020769703b5"))
    }

    #[test]
    fn ieee_vector_aad_and_nonce() {
        let (aad, nonce) = derive(&vector_header(), &vector_ccmp_header());
        assert_eq!(
            aad.as_bytes(),
            &hex!("08400fd2e128a57c5030f1844408abaea5b8fcba0000")[..]
        );
        assert_eq!(aad.len(), 22);
        assert_eq!(&aad.blocks()[..2], &[0x00, 0x16]);
        assert_eq!(nonce.0, hex!("005030f1844408b5039776e70c"));
    }

    #[test]
    fn aad_lengths() {
        let base = vector_header();

        let mut qos = base.clone();
        qos.frame_control = FrameControl(0x4188);
        qos.qos_ctrl = Some(QosControl(0x0002));
        let (aad, _) = derive(&qos, &vector_ccmp_header());
        assert_eq!(aad.len(), 24);

        let mut wds = base.clone();
        wds.frame_control = FrameControl(0x4308);
        wds.addr4 = Some([0x02, 0, 0, 0, 0, 0x04]);
        let (aad, _) = derive(&wds, &vector_ccmp_header());
        assert_eq!(aad.len(), 28);
        assert_eq!(&aad.as_bytes()[22..28], &[0x02, 0, 0, 0, 0, 0x04]);

        let mut wds_qos = wds.clone();
        wds_qos.frame_control = FrameControl(0x4388);
        wds_qos.qos_ctrl = Some(QosControl(0x0003));
        let (aad, _) = derive(&wds_qos, &vector_ccmp_header());
        assert_eq!(aad.len(), AAD_MAX_LEN);
        assert_eq!(&aad.blocks()[..2], &[0x00, 30]);
        assert_eq!(&aad.as_bytes()[28..], &[0x03, 0x00]);
    }

    #[test]
    fn qos_aad_and_nonce() {
        let raw = hex!(
            "8849 3a01 020000000001 020000000002 020000000003 5012 8500"
        );
        let hdr = MacHeader::from_bytes(&raw);
        let ccmp = CcmpHeader::new(hex!("0100002000000000"));
        let (aad, nonce) = derive(&hdr, &ccmp);
        assert_eq!(
            aad.as_bytes(),
            &hex!("884102000000000102000000000202000000000300000500")[..]
        );
        assert_eq!(nonce.0, hex!("05020000000002000000000001"));
    }

    #[test]
    fn wds_qos_aad_and_nonce() {
        let raw = hex!(
            "8843 0000 020000000001 020000000002 020000000003 a000
             020000000004 0300"
        );
        let hdr = MacHeader::from_bytes(&raw);
        let ccmp = CcmpHeader::new(hex!("2a0b002001020304"));
        let (aad, nonce) = derive(&hdr, &ccmp);
        assert_eq!(
            aad.as_bytes(),
            &hex!(
                "8843020000000001020000000002020000000003
                 00000200000000040300"
            )[..]
        );
        assert_eq!(nonce.0, hex!("03020000000002040302010b2a"));
    }

    #[test]
    fn management_aad_and_nonce() {
        let raw = hex!("d040 0000 020000000001 020000000002 020000000002 1000");
        let hdr = MacHeader::from_bytes(&raw);
        let ccmp = CcmpHeader::new(hex!("0700002000000000"));
        let (aad, nonce) = derive(&hdr, &ccmp);
        // Subtype bits are kept for management frames
        assert_eq!(
            aad.as_bytes(),
            &hex!("d0400200000000010200000000020200000000020000")[..]
        );
        assert_eq!(nonce.flags(), NONCE_MGMT_FLAG);
        assert_eq!(nonce.0, hex!("10020000000002000000000007"));
    }

    #[test]
    fn mutable_bits_do_not_change_aad() {
        let hdr = vector_header();
        let ccmp = vector_ccmp_header();
        let (aad, nonce) = derive(&hdr, &ccmp);

        for bit in [
            FrameControl::RETRY,
            FrameControl::PWR_MGMT,
            FrameControl::MORE_DATA,
            FrameControl::PROTECTED,
        ] {
            let mut toggled = hdr.clone();
            toggled.frame_control.0 ^= bit;
            assert_eq!(derive(&toggled, &ccmp), (aad.clone(), nonce));
        }

        let mut reseq = hdr.clone();
        reseq.seq_ctrl = SequenceControl::new(0x0ab, hdr.seq_ctrl.fragment_number());
        assert_eq!(derive(&reseq, &ccmp).0, aad);
    }

    #[test]
    fn fragment_number_is_authenticated() {
        let hdr = vector_header();
        let ccmp = vector_ccmp_header();
        let mut frag = hdr.clone();
        frag.seq_ctrl.0 ^= 0x0001;
        assert_ne!(derive(&frag, &ccmp).0, derive(&hdr, &ccmp).0);
    }

    #[test]
    fn qos_masking() {
        let raw = hex!(
            "8841 0000 020000000001 020000000002 020000000003 0000 0500"
        );
        let hdr = MacHeader::from_bytes(&raw);
        let ccmp = CcmpHeader::new(hex!("0100002000000000"));
        let (aad, _) = derive(&hdr, &ccmp);

        // A-MSDU present, EOSP/ack policy bits and the TXOP byte are masked
        let mut noisy = hdr.clone();
        noisy.qos_ctrl = Some(QosControl(0xff_f5));
        // Order bit is masked for QoS data
        noisy.frame_control.0 |= FrameControl::ORDER;
        assert_eq!(derive(&noisy, &ccmp).0, aad);

        // The TID is not
        let mut other_tid = hdr.clone();
        other_tid.qos_ctrl = Some(QosControl(0x0006));
        let (other_aad, other_nonce) = derive(&other_tid, &ccmp);
        assert_ne!(other_aad, aad);
        assert_eq!(other_nonce.flags(), 6);
    }

    #[test]
    fn order_bit_kept_without_qos() {
        let hdr = vector_header();
        let ccmp = vector_ccmp_header();
        let mut ordered = hdr.clone();
        ordered.frame_control.0 |= FrameControl::ORDER;
        assert_eq!(derive(&ordered, &ccmp).0.as_bytes()[1], 0xc0);
    }

    #[test]
    fn nonce_packet_number_order() {
        let hdr = vector_header();
        let raw = [0xa0, 0xa1, 0x00, 0x20, 0xa4, 0xa5, 0xa6, 0xa7];
        let (_, nonce) = derive(&hdr, &CcmpHeader::new(raw));
        assert_eq!(
            &nonce.0[7..],
            &[raw[7], raw[6], raw[5], raw[4], raw[1], raw[0]]
        );
        assert_eq!(
            &nonce.0[7..],
            &PacketNumber::new(0xa7a6_a5a4_a1a0).to_nonce_bytes()
        );
        assert_eq!(&nonce.0[1..7], &hdr.addr2);
    }
}
