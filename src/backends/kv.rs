//! Embedded ordered key-value store `DataSource` (SPARSE), using `sled`
//! in place of the original's RocksDB (DESIGN.md decision #5). Values are
//! encoded with a tag byte (§6: nil/false/true/int/uint/float/str/
//! json-composite); keys use a *separate* tag scheme (below) so that
//! `sled`'s byte-ordered iteration yields the Key ordering §3 defines.

use crate::datasource::{DataSource, Kind, Mode, Origin, ReportedType, Stats};
use crate::error::{NodelError, NodelResult};
use crate::key::Key;
use crate::uri::Uri;
use crate::value::Value;
use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

const TAG_NIL: u8 = 0;
const TAG_FALSE: u8 = 1;
const TAG_TRUE: u8 = 2;
const TAG_INT: u8 = 3;
const TAG_UINT: u8 = 4;
const TAG_FLOAT: u8 = 5;
const TAG_STR: u8 = 6;
const TAG_JSON: u8 = 7;

// Key encoding is intentionally a different scheme from value encoding
// above: Int/Uint/Float share one tag (`KEY_TAG_NUM`) because they share
// one ordering cluster in `Key::Ord` (key.rs's `cluster()`), so byte
// order must be driven by magnitude, not by source type.
const KEY_TAG_NIL: u8 = 0;
const KEY_TAG_FALSE: u8 = 1;
const KEY_TAG_TRUE: u8 = 2;
const KEY_TAG_NUM: u8 = 3;
const KEY_TAG_STR: u8 = 4;

const NUM_SUBTYPE_INT: u8 = 0;
const NUM_SUBTYPE_UINT: u8 = 1;
const NUM_SUBTYPE_FLOAT: u8 = 2;

const EXPONENT_BIAS: i32 = 1100;

/// Normalizes a numeric key's magnitude to `(is_negative, is_zero,
/// exponent, mantissa)`, where the value equals `mantissa / 2^63 *
/// 2^exponent` (mantissa's top bit is the implicit leading one, matching
/// IEEE-754's own normalized form). Int/Uint magnitudes fit in 64 bits
/// exactly, so unlike converting through `f64` this loses no precision —
/// an Int and a Uint with crossing magnitudes still compare correctly.
fn numeric_components(key: &Key) -> (bool, bool, i32, u64) {
    fn normalize_u64(mag: u64) -> (i32, u64) {
        let exponent = 63 - mag.leading_zeros() as i32;
        (exponent, mag << (63 - exponent))
    }
    match key {
        Key::Int(i) => {
            if *i == 0 {
                return (false, true, 0, 0);
            }
            let (exponent, mantissa) = normalize_u64(i.unsigned_abs());
            (*i < 0, false, exponent, mantissa)
        }
        Key::Uint(u) => {
            if *u == 0 {
                return (false, true, 0, 0);
            }
            let (exponent, mantissa) = normalize_u64(*u);
            (false, false, exponent, mantissa)
        }
        Key::Float(f) => {
            if *f == 0.0 {
                return (false, true, 0, 0);
            }
            let negative = f.is_sign_negative();
            if f.is_nan() {
                return (negative, false, i32::MAX, u64::MAX);
            }
            let bits = f.abs().to_bits();
            let biased_exp = ((bits >> 52) & 0x7FF) as i32;
            let frac = bits & 0x000F_FFFF_FFFF_FFFF;
            if biased_exp == 0 {
                // Subnormal: keep it ordered below every normal float by
                // pinning it to one exponent step below the smallest
                // normal exponent; relative order among subnormals is
                // still exact since it's driven by `frac`.
                (negative, false, -1023, frac << 11)
            } else {
                (negative, false, biased_exp - 1023, (1u64 << 63) | (frac << 11))
            }
        }
        _ => unreachable!("numeric_components called on a non-numeric key"),
    }
}

/// Order-preserving 11-byte prefix (sign bucket + exponent + mantissa)
/// for the merged Int/Uint/Float key cluster.
fn numeric_sort_prefix(key: &Key) -> [u8; 11] {
    let (negative, is_zero, exponent, mantissa) = numeric_components(key);
    let mut out = [0u8; 11];
    if is_zero {
        out[0] = 1;
        return out;
    }
    let exponent_biased = (exponent + EXPONENT_BIAS) as u16;
    if negative {
        out[0] = 0;
        out[1..3].copy_from_slice(&(!exponent_biased).to_be_bytes());
        out[3..11].copy_from_slice(&(!mantissa).to_be_bytes());
    } else {
        out[0] = 2;
        out[1..3].copy_from_slice(&exponent_biased.to_be_bytes());
        out[3..11].copy_from_slice(&mantissa.to_be_bytes());
    }
    out
}

/// Encodes a Key so that byte-lexicographic order matches `Key`'s own
/// `Ord` (§3): the leading tag sorts Nil < Bool < numeric < Str, and
/// within the numeric tag the sort prefix orders by actual magnitude so
/// Int/Uint/Float keys with crossing magnitudes still interleave
/// correctly. The subtype byte and raw bit pattern that follow the sort
/// prefix carry no ordering weight — they exist purely so `decode_key`
/// can recover the exact original variant.
fn encode_key(key: &Key) -> Vec<u8> {
    match key {
        Key::Nil => vec![KEY_TAG_NIL],
        Key::Bool(false) => vec![KEY_TAG_FALSE],
        Key::Bool(true) => vec![KEY_TAG_TRUE],
        Key::Int(i) => {
            let mut out = vec![KEY_TAG_NUM];
            out.extend_from_slice(&numeric_sort_prefix(key));
            out.push(NUM_SUBTYPE_INT);
            out.extend_from_slice(&i.to_be_bytes());
            out
        }
        Key::Uint(u) => {
            let mut out = vec![KEY_TAG_NUM];
            out.extend_from_slice(&numeric_sort_prefix(key));
            out.push(NUM_SUBTYPE_UINT);
            out.extend_from_slice(&u.to_be_bytes());
            out
        }
        Key::Float(f) => {
            let mut out = vec![KEY_TAG_NUM];
            out.extend_from_slice(&numeric_sort_prefix(key));
            out.push(NUM_SUBTYPE_FLOAT);
            out.extend_from_slice(&f.to_bits().to_be_bytes());
            out
        }
        Key::Str(s) => {
            let mut out = vec![KEY_TAG_STR];
            out.extend_from_slice(s.as_bytes());
            out
        }
    }
}

fn encode_value(value: &Value) -> NodelResult<Vec<u8>> {
    if value.is_nil() {
        return Ok(vec![TAG_NIL]);
    }
    if let Ok(b) = value.as_bool() {
        return Ok(vec![if b { TAG_TRUE } else { TAG_FALSE }]);
    }
    if let Ok(i) = value.as_int() {
        let mut out = vec![TAG_INT];
        out.extend_from_slice(&i.to_be_bytes());
        return Ok(out);
    }
    if let Ok(u) = value.as_uint() {
        let mut out = vec![TAG_UINT];
        out.extend_from_slice(&u.to_be_bytes());
        return Ok(out);
    }
    if let Ok(f) = value.as_float() {
        let mut out = vec![TAG_FLOAT];
        out.extend_from_slice(&f.to_bits().to_be_bytes());
        return Ok(out);
    }
    if let Ok(s) = value.as_str() {
        let mut out = vec![TAG_STR];
        out.extend_from_slice(s.as_bytes());
        return Ok(out);
    }
    // Composites (lists/maps) are stored as opaque JSON under tag 7.
    let json = crate::serialize::json::value_to_json(value, &crate::serialize::json::JsonConfig::compact());
    let mut out = vec![TAG_JSON];
    out.extend_from_slice(json.as_bytes());
    Ok(out)
}

fn decode_value(bytes: &[u8]) -> NodelResult<Value> {
    let (tag, rest) = bytes.split_first().ok_or_else(|| NodelError::Invariant("empty kvdb value".into()))?;
    Ok(match *tag {
        TAG_NIL => Value::nil(),
        TAG_FALSE => Value::from(false),
        TAG_TRUE => Value::from(true),
        TAG_INT => Value::from(i64::from_be_bytes(rest.try_into().map_err(|_| NodelError::Invariant("bad int encoding".into()))?)),
        TAG_UINT => Value::from(u64::from_be_bytes(rest.try_into().map_err(|_| NodelError::Invariant("bad uint encoding".into()))?)),
        TAG_FLOAT => Value::from(f64::from_bits(u64::from_be_bytes(
            rest.try_into().map_err(|_| NodelError::Invariant("bad float encoding".into()))?,
        ))),
        TAG_STR => Value::from(std::str::from_utf8(rest).unwrap_or("").to_string()),
        TAG_JSON => crate::parse::json::parse_json(
            std::str::from_utf8(rest).unwrap_or("null"),
            crate::parse::json::JsonParseConfig::default(),
        ),
        other => return Err(NodelError::Invariant(format!("unknown kvdb value tag {}", other))),
    })
}

#[derive(Debug)]
pub struct KvOptions {
    pub path: PathBuf,
}

/// A bound embedded key-value store: reported type SMAP (key-ordered),
/// SPARSE (entries are read/written individually rather than all at
/// once).
pub struct KvSource {
    path: RefCell<PathBuf>,
    db: RefCell<Option<sled::Db>>,
    stats: Stats,
}

impl std::fmt::Debug for KvSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KvSource").field("path", &self.path.borrow()).finish()
    }
}

impl KvSource {
    pub fn new(path: PathBuf, _origin: Origin) -> Self {
        KvSource { path: RefCell::new(path), db: RefCell::new(None), stats: Stats::new() }
    }

    fn open(&self) -> NodelResult<sled::Db> {
        if let Some(db) = self.db.borrow().as_ref() {
            return Ok(db.clone());
        }
        let db = sled::open(&*self.path.borrow()).map_err(|e| NodelError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?;
        *self.db.borrow_mut() = Some(db.clone());
        Ok(db)
    }
}

impl DataSource for KvSource {
    fn kind(&self) -> Kind {
        Kind::Sparse
    }
    fn origin(&self) -> Origin {
        Origin::Source
    }
    fn mode(&self) -> Mode {
        Mode::read_write()
    }
    fn stats(&self) -> &Stats {
        &self.stats
    }
    fn probe_type(&self) -> NodelResult<ReportedType> {
        Ok(ReportedType::Smap)
    }

    fn read_all(&self, _target: &Value) -> NodelResult<()> {
        // SPARSE: no-op, per §4.2 "SPARSE sources may no-op or read
        // metadata only."
        self.stats.read_all_calls.set(self.stats.read_all_calls.get() + 1);
        Ok(())
    }

    fn read_key(&self, _target: &Value, key: &Key) -> NodelResult<Value> {
        self.stats.read_key_calls.set(self.stats.read_key_calls.get() + 1);
        let db = self.open()?;
        match db.get(encode_key(key)).map_err(|e| NodelError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))? {
            Some(bytes) => decode_value(&bytes),
            None => Ok(Value::nil()),
        }
    }

    fn write_all(&self, target: &Value) -> NodelResult<()> {
        self.stats.write_all_calls.set(self.stats.write_all_calls.get() + 1);
        let db = self.open()?;
        for (key, value) in target.items()? {
            db.insert(encode_key(&key), encode_value(&value)?)
                .map_err(|e| NodelError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?;
        }
        db.flush().map_err(|e| NodelError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?;
        Ok(())
    }

    fn write_key(&self, _target: &Value, key: &Key, value: &Value) -> NodelResult<()> {
        self.stats.write_key_calls.set(self.stats.write_key_calls.get() + 1);
        let db = self.open()?;
        db.insert(encode_key(key), encode_value(value)?)
            .map_err(|e| NodelError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?;
        Ok(())
    }

    fn commit(&self, _target: &Value, updates: &[(Key, Value)], deleted: &[Key]) -> NodelResult<()> {
        self.stats.commit_calls.set(self.stats.commit_calls.get() + 1);
        let db = self.open()?;
        for key in deleted {
            db.remove(encode_key(key)).map_err(|e| NodelError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?;
        }
        for (key, value) in updates {
            db.insert(encode_key(key), encode_value(value)?)
                .map_err(|e| NodelError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?;
        }
        db.flush().map_err(|e| NodelError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?;
        Ok(())
    }

    fn configure(&self, uri: &Uri) -> NodelResult<()> {
        let path = uri.resolve_path(".")?;
        *self.path.borrow_mut() = PathBuf::from(path);
        Ok(())
    }
}

/// Iterates every key currently stored, in the byte order `encode_key`
/// establishes (which matches `Key`'s own total order, §3). Exposed
/// separately from the `DataSource` trait since ordered full-range
/// iteration isn't part of the common contract other backends share.
pub fn iter_keys(source: &KvSource) -> NodelResult<Vec<Key>> {
    let db = source.open()?;
    let mut out = Vec::new();
    for item in db.iter() {
        let (k, _) = item.map_err(|e| NodelError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?;
        out.push(decode_key(&k)?);
    }
    Ok(out)
}

fn decode_key(bytes: &[u8]) -> NodelResult<Key> {
    let (tag, rest) = bytes.split_first().ok_or_else(|| NodelError::Invariant("empty kvdb key".into()))?;
    Ok(match *tag {
        KEY_TAG_NIL => Key::Nil,
        KEY_TAG_FALSE => Key::Bool(false),
        KEY_TAG_TRUE => Key::Bool(true),
        KEY_TAG_NUM => {
            let tail = rest
                .get(11..)
                .ok_or_else(|| NodelError::Invariant("truncated numeric kvdb key".into()))?;
            let (subtype, raw) = tail.split_first().ok_or_else(|| NodelError::Invariant("truncated numeric kvdb key".into()))?;
            match *subtype {
                NUM_SUBTYPE_INT => {
                    Key::Int(i64::from_be_bytes(raw.try_into().map_err(|_| NodelError::Invariant("bad int key".into()))?))
                }
                NUM_SUBTYPE_UINT => {
                    Key::Uint(u64::from_be_bytes(raw.try_into().map_err(|_| NodelError::Invariant("bad uint key".into()))?))
                }
                NUM_SUBTYPE_FLOAT => Key::Float(f64::from_bits(u64::from_be_bytes(
                    raw.try_into().map_err(|_| NodelError::Invariant("bad float key".into()))?,
                ))),
                other => return Err(NodelError::Invariant(format!("unknown kvdb numeric key subtype {}", other))),
            }
        }
        KEY_TAG_STR => Key::str(std::str::from_utf8(rest).unwrap_or("")),
        other => return Err(NodelError::Invariant(format!("unknown kvdb key tag {}", other))),
    })
}

pub fn register() {
    crate::uri::register_scheme("kvdb", |uri, origin| {
        let path = PathBuf::from(uri.resolve_path(".")?);
        let ds: Rc<dyn DataSource> = Rc::new(KvSource::new(path, origin));
        Ok(ds)
    });
}
