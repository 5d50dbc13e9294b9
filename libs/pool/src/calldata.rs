//! Binary user-data codec for swap, join and exit requests
//!
//! The custodian forwards an opaque user-data blob with every callback; its
//! first byte selects the operation and the remaining fields are fixed-width
//! big-endian integers. Layouts (after the tag byte):
//!
//! ```text
//! swap   regular / partner   min_amount_out u128
//!        long-term           num_intervals u64 | delegate [20]
//! join   join / reward       (empty)
//!        extend              order_id u64
//! exit   exit                shares u128
//!        withdraw / cancel   order_id u64 | has_recipient u8 | recipient [20]
//!        fee withdraw        (empty)
//! ```
//!
//! Trailing bytes are rejected.

use crate::error::{PoolError, PoolResult};
use crate::operations::{ExitKind, JoinKind, SwapKind};
use crate::types::Address;
use byteorder::{BigEndian, ByteOrder, ReadBytesExt};
use num_enum::{IntoPrimitive, TryFromPrimitive};
use std::io::{Cursor, Read};

#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum SwapTag {
    Regular = 0,
    LongTerm = 1,
    Partner = 2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum JoinTag {
    Join = 0,
    Reward = 1,
    Extend = 2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum ExitTag {
    Exit = 0,
    Withdraw = 1,
    Cancel = 2,
    FeeWithdraw = 3,
}

pub fn encode_swap(kind: &SwapKind) -> Vec<u8> {
    match *kind {
        SwapKind::Regular { min_amount_out } => with_u128(SwapTag::Regular.into(), min_amount_out),
        SwapKind::Partner { min_amount_out } => with_u128(SwapTag::Partner.into(), min_amount_out),
        SwapKind::LongTerm {
            num_intervals,
            delegate,
        } => {
            let mut buf = vec![0u8; 1 + 8 + 20];
            buf[0] = SwapTag::LongTerm.into();
            BigEndian::write_u64(&mut buf[1..9], num_intervals);
            buf[9..].copy_from_slice(&delegate);
            buf
        }
    }
}

pub fn decode_swap(data: &[u8]) -> PoolResult<SwapKind> {
    let mut cursor = Cursor::new(data);
    let tag = read_tag(&mut cursor)?;
    let tag = SwapTag::try_from(tag).map_err(|_| PoolError::UnknownOperation { kind: "swap", tag })?;
    let kind = match tag {
        SwapTag::Regular => SwapKind::Regular {
            min_amount_out: read_u128(&mut cursor)?,
        },
        SwapTag::Partner => SwapKind::Partner {
            min_amount_out: read_u128(&mut cursor)?,
        },
        SwapTag::LongTerm => SwapKind::LongTerm {
            num_intervals: read_u64(&mut cursor)?,
            delegate: read_address(&mut cursor)?,
        },
    };
    finish(&cursor)?;
    Ok(kind)
}

pub fn encode_join(kind: &JoinKind) -> Vec<u8> {
    match *kind {
        JoinKind::Join => vec![JoinTag::Join.into()],
        JoinKind::Reward => vec![JoinTag::Reward.into()],
        JoinKind::Extend { order_id } => with_order_id(JoinTag::Extend.into(), order_id),
    }
}

pub fn decode_join(data: &[u8]) -> PoolResult<JoinKind> {
    let mut cursor = Cursor::new(data);
    let tag = read_tag(&mut cursor)?;
    let tag = JoinTag::try_from(tag).map_err(|_| PoolError::UnknownOperation { kind: "join", tag })?;
    let kind = match tag {
        JoinTag::Join => JoinKind::Join,
        JoinTag::Reward => JoinKind::Reward,
        JoinTag::Extend => JoinKind::Extend {
            order_id: read_u64(&mut cursor)?,
        },
    };
    finish(&cursor)?;
    Ok(kind)
}

pub fn encode_exit(kind: &ExitKind) -> Vec<u8> {
    match *kind {
        ExitKind::Exit { shares } => with_u128(ExitTag::Exit.into(), shares),
        ExitKind::Withdraw {
            order_id,
            recipient,
        } => with_recipient(ExitTag::Withdraw.into(), order_id, recipient),
        ExitKind::Cancel {
            order_id,
            recipient,
        } => with_recipient(ExitTag::Cancel.into(), order_id, recipient),
        ExitKind::FeeWithdraw => vec![ExitTag::FeeWithdraw.into()],
    }
}

pub fn decode_exit(data: &[u8]) -> PoolResult<ExitKind> {
    let mut cursor = Cursor::new(data);
    let tag = read_tag(&mut cursor)?;
    let tag = ExitTag::try_from(tag).map_err(|_| PoolError::UnknownOperation { kind: "exit", tag })?;
    let kind = match tag {
        ExitTag::Exit => ExitKind::Exit {
            shares: read_u128(&mut cursor)?,
        },
        ExitTag::Withdraw => {
            let (order_id, recipient) = read_order_and_recipient(&mut cursor)?;
            ExitKind::Withdraw {
                order_id,
                recipient,
            }
        }
        ExitTag::Cancel => {
            let (order_id, recipient) = read_order_and_recipient(&mut cursor)?;
            ExitKind::Cancel {
                order_id,
                recipient,
            }
        }
        ExitTag::FeeWithdraw => ExitKind::FeeWithdraw,
    };
    finish(&cursor)?;
    Ok(kind)
}

fn with_u128(tag: u8, value: u128) -> Vec<u8> {
    let mut buf = vec![0u8; 1 + 16];
    buf[0] = tag;
    BigEndian::write_u128(&mut buf[1..], value);
    buf
}

fn with_order_id(tag: u8, order_id: u64) -> Vec<u8> {
    let mut buf = vec![0u8; 1 + 8];
    buf[0] = tag;
    BigEndian::write_u64(&mut buf[1..], order_id);
    buf
}

fn with_recipient(tag: u8, order_id: u64, recipient: Option<Address>) -> Vec<u8> {
    let mut buf = with_order_id(tag, order_id);
    match recipient {
        Some(account) => {
            buf.push(1);
            buf.extend_from_slice(&account);
        }
        None => {
            buf.push(0);
            buf.extend_from_slice(&[0u8; 20]);
        }
    }
    buf
}

fn read_tag(cursor: &mut Cursor<&[u8]>) -> PoolResult<u8> {
    cursor
        .read_u8()
        .map_err(|_| PoolError::MalformedUserData("missing operation tag"))
}

fn read_u64(cursor: &mut Cursor<&[u8]>) -> PoolResult<u64> {
    cursor
        .read_u64::<BigEndian>()
        .map_err(|_| PoolError::MalformedUserData("truncated u64 field"))
}

fn read_u128(cursor: &mut Cursor<&[u8]>) -> PoolResult<u128> {
    cursor
        .read_u128::<BigEndian>()
        .map_err(|_| PoolError::MalformedUserData("truncated u128 field"))
}

fn read_address(cursor: &mut Cursor<&[u8]>) -> PoolResult<Address> {
    let mut address = [0u8; 20];
    cursor
        .read_exact(&mut address)
        .map_err(|_| PoolError::MalformedUserData("truncated address field"))?;
    Ok(address)
}

fn read_order_and_recipient(cursor: &mut Cursor<&[u8]>) -> PoolResult<(u64, Option<Address>)> {
    let order_id = read_u64(cursor)?;
    let has_recipient = cursor
        .read_u8()
        .map_err(|_| PoolError::MalformedUserData("missing recipient flag"))?;
    let recipient = read_address(cursor)?;
    match has_recipient {
        0 => Ok((order_id, None)),
        1 => Ok((order_id, Some(recipient))),
        _ => Err(PoolError::MalformedUserData("invalid recipient flag")),
    }
}

fn finish(cursor: &Cursor<&[u8]>) -> PoolResult<()> {
    if (cursor.position() as usize) < cursor.get_ref().len() {
        return Err(PoolError::MalformedUserData("trailing bytes"));
    }
    Ok(())
}
