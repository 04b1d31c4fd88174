//! CCMP decryption and MIC verification.
//!
//! CCMP is AES-CCM with an 8-byte MIC (M = 8) and a 2-byte length field
//! (L = 2), keyed with the 128-bit temporal key.

use aes_soft::cipher::generic_array::typenum::U16;
use aes_soft::cipher::generic_array::GenericArray;
use aes_soft::cipher::{BlockCipher, NewBlockCipher};
use aes_soft::Aes128;

use alloc::vec;
use alloc::vec::Vec;

use zeroize::Zeroize;

use crate::context::{self, Aad, Nonce};
use crate::error::Error;
use crate::frame::{CcmpHeader, MacHeader};

const AES_BLOCK_SIZE: usize = 16;
/// Length of the CCMP MIC in bytes.
pub const MIC_LEN: usize = 8;
/// Smallest protected body: CCMP header and MIC around an empty payload.
pub const MIN_BODY_LEN: usize = CcmpHeader::LEN + MIC_LEN;
// Largest payload expressible in the 2-byte CCM length field
const CCM_PAYLOAD_MAX_BYTES: usize = 0xFFFF;

// Flags byte of B_0: Adata = 1, M' = (M - 2) / 2 = 3, L' = L - 1 = 1
const FLAGS_ADATA: u8 = 0x40;
const FLAGS_M: u8 = ((MIC_LEN as u8 - 2) / 2) << 3;
const FLAGS_L: u8 = 1;
const B0_FLAGS: u8 = FLAGS_ADATA | FLAGS_M | FLAGS_L;
// Flags byte of A_i: only L'
const A_FLAGS: u8 = FLAGS_L;

type Block = [u8; AES_BLOCK_SIZE];

/// XORs `src` into `dst` over the length of `src`.
///
/// `src` may be shorter than `dst`, which is the same as XORing a
/// zero-padded block.
fn xor_block(dst: &mut Block, src: &[u8]) {
    for (d, s) in dst.iter_mut().zip(src) {
        *d ^= s;
    }
}

fn encrypt_block<C>(cipher: &C, block: &mut Block)
where
    C: BlockCipher<BlockSize = U16>,
{
    cipher.encrypt_block(GenericArray::from_mut_slice(block));
}

/// A CTR counter block, `A_i = flags | nonce | i`.
#[derive(Clone, Copy)]
struct CounterBlock(Block);

impl CounterBlock {
    fn new(nonce: &Nonce) -> Self {
        let mut a = [0u8; AES_BLOCK_SIZE];
        a[0] = A_FLAGS;
        a[1..14].copy_from_slice(nonce.as_bytes());
        CounterBlock(a)
    }

    /// Returns `S_i = E(K, A_i)`.
    fn keystream<C>(&self, cipher: &C, i: u16) -> Block
    where
        C: BlockCipher<BlockSize = U16>,
    {
        let mut s = self.0;
        s[14..].copy_from_slice(&i.to_be_bytes());
        encrypt_block(cipher, &mut s);
        s
    }
}

/// The CBC-MAC chaining value `X_i`.
struct ChainBlock(Block);

impl ChainBlock {
    /// Returns `X_1 = E(K, B_0)`, `B_0 = flags | nonce | l(m)`.
    fn start<C>(cipher: &C, nonce: &Nonce, payload_len: u16) -> Self
    where
        C: BlockCipher<BlockSize = U16>,
    {
        let mut b = [0u8; AES_BLOCK_SIZE];
        b[0] = B0_FLAGS;
        b[1..14].copy_from_slice(nonce.as_bytes());
        b[14..].copy_from_slice(&payload_len.to_be_bytes());
        trace!("CCMP B_0: {}", crate::utils::log::Hex(&b));
        encrypt_block(cipher, &mut b);
        ChainBlock(b)
    }

    /// `X_i+1 = E(K, X_i XOR B_i)` for every block of `data`, the last one
    /// zero-padded.
    fn absorb<C>(&mut self, cipher: &C, data: &[u8])
    where
        C: BlockCipher<BlockSize = U16>,
    {
        for b in data.chunks(AES_BLOCK_SIZE) {
            xor_block(&mut self.0, b);
            encrypt_block(cipher, &mut self.0);
        }
    }

    fn tag(&self) -> [u8; MIC_LEN] {
        let mut t = [0u8; MIC_LEN];
        t.copy_from_slice(&self.0[..MIC_LEN]);
        t
    }
}

/// A protected frame body split into its parts.
struct ProtectedBody<'a> {
    header: CcmpHeader,
    payload: &'a [u8],
    mic: [u8; MIC_LEN],
}

impl<'a> ProtectedBody<'a> {
    fn parse(body: &'a [u8]) -> Result<Self, Error> {
        if body.len() < MIN_BODY_LEN
            || body.len() - MIN_BODY_LEN > CCM_PAYLOAD_MAX_BYTES
        {
            return Err(Error::MalformedFrame);
        }

        let mut header = [0u8; CcmpHeader::LEN];
        header.copy_from_slice(&body[..CcmpHeader::LEN]);
        let mut mic = [0u8; MIC_LEN];
        mic.copy_from_slice(&body[body.len() - MIC_LEN..]);

        Ok(ProtectedBody {
            header: CcmpHeader::new(header),
            payload: &body[CcmpHeader::LEN..body.len() - MIC_LEN],
            mic,
        })
    }
}

/// Variation of CTR mode used in CCM: the first payload block uses
/// counter 1, counter 0 is kept for the MIC.
fn ccm_ctr_mode<C>(out: &mut [u8], input: &[u8], a: &CounterBlock, cipher: &C)
where
    C: BlockCipher<BlockSize = U16>,
{
    for (i, (o, m)) in out
        .chunks_mut(AES_BLOCK_SIZE)
        .zip(input.chunks(AES_BLOCK_SIZE))
        .enumerate()
    {
        // Payload length is bounded by the 16-bit CCM length field
        let s = a.keystream(cipher, i as u16 + 1);
        for ((o, m), s) in o.iter_mut().zip(m).zip(s.iter()) {
            *o = m ^ s;
        }
    }
}

/// Variation of CBC-MAC mode used in CCM: AAD (with its length prefix) and
/// plaintext are each padded to a block boundary on their own.
fn ccm_cbc_mac<C>(
    cipher: &C,
    nonce: &Nonce,
    aad: &Aad,
    plaintext: &[u8],
) -> [u8; MIC_LEN]
where
    C: BlockCipher<BlockSize = U16>,
{
    let mut x = ChainBlock::start(cipher, nonce, plaintext.len() as u16);
    x.absorb(cipher, aad.blocks());
    x.absorb(cipher, plaintext);
    x.tag()
}

/// Decrypts and verifies a CCMP protected frame body.
///
/// `body` is everything following the MAC header: the 8-byte CCMP header,
/// the encrypted payload and the 8-byte MIC. The returned buffer holds the
/// payload only.
///
/// # Errors
/// * [`Error::MalformedFrame`] if `body` is shorter than 16 bytes. This is
///   checked before the key schedule is set up.
/// * [`Error::IntegrityFailure`] if the MIC does not match. No plaintext is
///   returned in that case.
pub fn decrypt(
    key: &[u8; 16],
    header: &MacHeader,
    body: &[u8],
) -> Result<Vec<u8>, Error> {
    let body = ProtectedBody::parse(body)?;
    let cipher = Aes128::new(GenericArray::from_slice(key));
    decrypt_body(&cipher, header, &body)
}

/// Like [`decrypt`], with an already initialized block cipher.
///
/// The cipher is only read, so one key schedule may be shared between
/// threads decrypting frames under the same temporal key.
pub fn decrypt_with<C>(
    cipher: &C,
    header: &MacHeader,
    body: &[u8],
) -> Result<Vec<u8>, Error>
where
    C: BlockCipher<BlockSize = U16>,
{
    let body = ProtectedBody::parse(body)?;
    decrypt_body(cipher, header, &body)
}

fn decrypt_body<C>(
    cipher: &C,
    header: &MacHeader,
    body: &ProtectedBody,
) -> Result<Vec<u8>, Error>
where
    C: BlockCipher<BlockSize = U16>,
{
    let (aad, nonce) = context::derive(header, &body.header);
    let a = CounterBlock::new(&nonce);

    // U = T XOR S_0
    trace!("CCMP U: {}", crate::utils::log::Hex(&body.mic));
    let s0 = a.keystream(cipher, 0);
    let mut t = body.mic;
    xor_block_tag(&mut t, &s0);
    trace!("CCMP T: {}", crate::utils::log::Hex(&t));

    let mut plain = vec![0u8; body.payload.len()];
    ccm_ctr_mode(&mut plain, body.payload, &a, cipher);

    let x = ccm_cbc_mac(cipher, &nonce, &aad, &plain);

    if x != t {
        info!(
            "Invalid CCMP MIC in frame from {}",
            crate::utils::log::MacAddrFmt(&header.addr2)
        );
        plain.zeroize();
        return Err(Error::IntegrityFailure);
    }

    debug!("CCMP decrypted {} bytes", plain.len());
    Ok(plain)
}

fn xor_block_tag(t: &mut [u8; MIC_LEN], s: &Block) {
    for (t, s) in t.iter_mut().zip(s.iter()) {
        *t ^= s;
    }
}
