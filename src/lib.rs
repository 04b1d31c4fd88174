//! A pure-Rust, `#![no_std]` decryptor for CCMP, the AES-CCM based
//! encapsulation protecting IEEE 802.11 data and management frames, built
//! on [RustCrypto's AES].
//!
//! ## Overview
//! CCMP encrypts the frame body with AES in CTR mode and authenticates the
//! masked MAC header (the AAD) together with the plaintext using CBC-MAC.
//! The 8-byte CCMP header carries the 48-bit packet number that, with the
//! transmitter address and the priority, forms the 13-byte CCM nonce.
//!
//! Given the temporal key, the MAC header and the protected frame body
//! (CCMP header, ciphertext and MIC), [`decrypt`] rebuilds the AAD and nonce,
//! decrypts the payload and only returns it when the MIC matches.
//!
//! Header fields that may change in transit (Retry, Power Management, More
//! Data, the sequence number and parts of QoS Control) are masked out of the
//! AAD, so retransmissions authenticate the same way as the original frame.
//!
//! Replay detection is left to the caller; [`CcmpHeader::packet_number`]
//! exposes the packet number for it.
//!
//! ## Usage
//! ```rust
//! use ccmp::{decrypt, MacHeader, FrameControl, SequenceControl};
//!
//! let tk = [
//!     0xc9, 0x7c, 0x1f, 0x67, 0xce, 0x37, 0x11, 0x85, 0x51, 0x4a, 0x8a,
//!     0x19, 0xf2, 0xbd, 0xd5, 0x2f,
//! ];
//!
//! let header = MacHeader {
//!     frame_control: FrameControl::from_le_bytes([0x08, 0x48]),
//!     addr1: [0x0f, 0xd2, 0xe1, 0x28, 0xa5, 0x7c],
//!     addr2: [0x50, 0x30, 0xf1, 0x84, 0x44, 0x08],
//!     addr3: [0xab, 0xae, 0xa5, 0xb8, 0xfc, 0xba],
//!     seq_ctrl: SequenceControl::from_le_bytes([0x80, 0x33]),
//!     addr4: None,
//!     qos_ctrl: None,
//! };
//!
//! let body = [
//!     // CCMP header
//!     0x0c, 0xe7, 0x00, 0x20, 0x76, 0x97, 0x03, 0xb5,
//!     // Encrypted payload
//!     0xf3, 0xd0, 0xa2, 0xfe, 0x9a, 0x3d, 0xbf, 0x23, 0x42, 0xa6, 0x43,
//!     0xe4, 0x32, 0x46, 0xe8, 0x0c, 0x3c, 0x04, 0xd0, 0x19,
//!     // MIC
//!     0x78, 0x45, 0xce, 0x0b, 0x16, 0xf9, 0x76, 0x23,
//! ];
//!
//! let plaintext = decrypt(&tk, &header, &body).unwrap();
//! assert_eq!(
//!     plaintext,
//!     [
//!         0xf8, 0xba, 0x1a, 0x55, 0xd0, 0x2f, 0x85, 0xae, 0x96, 0x7b, 0xb6,
//!         0x2f, 0xb6, 0xcd, 0xa8, 0xeb, 0x7e, 0x78, 0xa0, 0x50,
//!     ]
//! );
//! ```
//!
//! ## Features
//! * `std` (default): implements `std::error::Error` for [`Error`].
//! * `log`: emits the AAD, nonce and MIC blocks at trace level and MIC
//!   failures at info level through the [`log`] crate.
//!
//! ## Security
//! MIC comparison is not constant time. This crate is meant for checking
//! captured traffic, not for serving as a live decryption endpoint.
//!
//! [RustCrypto's AES]: https://github.com/RustCrypto/block-ciphers
//! [`log`]: https://docs.rs/log

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

#[cfg(all(test, not(feature = "std")))]
extern crate std;

#[cfg(test)]
#[macro_use]
extern crate hex_literal;

#[macro_use]
mod utils;

mod ccm;
pub mod context;
mod error;
pub mod frame;

pub use aes_soft::Aes128;
pub use ccm::{decrypt, decrypt_with, MIC_LEN, MIN_BODY_LEN};
pub use context::{derive, Aad, Nonce};
pub use error::Error;
pub use frame::{
    CcmpHeader, FrameControl, FrameType, MacAddr, MacHeader, PacketNumber,
    QosControl, SequenceControl,
};
