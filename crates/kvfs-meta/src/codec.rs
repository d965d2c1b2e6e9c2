//! Key and record codec for the metadata store.
//!
//! Keys pack `(parent inode id, name hash)` into 16 big-endian bytes so the
//! byte-lexicographic order of encoded keys equals the numeric order of the
//! pairs. Values carry a fixed 68-byte little-endian attribute header
//! followed by the raw entry name; both layouts are stable on-disk formats.

use kvfs_types::{make_error_msg, MetaCode, Result};

/// Inode identifier.
pub type InodeId = u64;

/// Reserved inode id for the root directory. Records carrying this id are
/// treated as the root sentinel and skipped during directory listing.
pub const ROOT_INODE_ID: InodeId = 0;

/// Encoded key width: parent id (8) + name hash (8).
pub const KEY_LEN: usize = 16;

/// Encoded attribute header width.
pub const ATTR_LEN: usize = 68;

/// Fixed hash seed. Part of the persisted key format; changing it orphans
/// every existing entry.
const NAME_HASH_SEED: u64 = 123;

// ── name hashing ────────────────────────────────────────────────────────────

/// Hash an entry name for use as the key tie-breaker within one parent.
pub fn name_hash(name: &str) -> u64 {
    murmur64a(name.as_bytes(), NAME_HASH_SEED)
}

/// MurmurHash64A for 64-bit platforms.
fn murmur64a(data: &[u8], seed: u64) -> u64 {
    const M: u64 = 0xc6a4_a793_5bd1_e995;
    const R: u32 = 47;

    let mut h = seed ^ (data.len() as u64).wrapping_mul(M);

    let chunks = data.chunks_exact(8);
    let tail = chunks.remainder();
    for chunk in chunks {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(chunk);
        let mut k = u64::from_le_bytes(buf);
        k = k.wrapping_mul(M);
        k ^= k >> R;
        k = k.wrapping_mul(M);
        h ^= k;
        h = h.wrapping_mul(M);
    }

    if !tail.is_empty() {
        let mut t = 0u64;
        for (i, &b) in tail.iter().enumerate() {
            t |= (b as u64) << (8 * i);
        }
        h ^= t;
        h = h.wrapping_mul(M);
    }

    h ^= h >> R;
    h = h.wrapping_mul(M);
    h ^= h >> R;
    h
}

// ── keys ────────────────────────────────────────────────────────────────────

/// Location of one entry in the keyspace: which directory it lives in and
/// the hash of its name within that directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InodeKey {
    pub parent: InodeId,
    pub name_hash: u64,
}

impl InodeKey {
    /// Key for `name` inside directory `parent`.
    pub fn for_entry(parent: InodeId, name: &str) -> Self {
        Self {
            parent,
            name_hash: name_hash(name),
        }
    }

    /// Key of the root directory's own record.
    pub fn root() -> Self {
        Self {
            parent: ROOT_INODE_ID,
            name_hash: 0,
        }
    }

    /// Encode to the 16-byte big-endian wire form.
    ///
    /// Big-endian field order makes encoded keys sort exactly like the
    /// numeric `(parent, name_hash)` pairs, which the directory range scan
    /// relies on.
    pub fn encode(&self) -> [u8; KEY_LEN] {
        let mut out = [0u8; KEY_LEN];
        out[..8].copy_from_slice(&self.parent.to_be_bytes());
        out[8..].copy_from_slice(&self.name_hash.to_be_bytes());
        out
    }

    /// Decode a stored key, failing on any length mismatch.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != KEY_LEN {
            return make_error_msg(
                MetaCode::MALFORMED_KEY,
                format!("key length {} != {}", bytes.len(), KEY_LEN),
            );
        }
        let mut parent = [0u8; 8];
        let mut hash = [0u8; 8];
        parent.copy_from_slice(&bytes[..8]);
        hash.copy_from_slice(&bytes[8..]);
        Ok(Self {
            parent: u64::from_be_bytes(parent),
            name_hash: u64::from_be_bytes(hash),
        })
    }
}

/// Scan bounds covering exactly the children of `parent`: begin key
/// `(parent, 0)` inclusive, end key `(parent + 1, 0)` exclusive. For the
/// last representable parent there is no end key; the caller scans to the
/// end of the keyspace.
pub fn children_range(parent: InodeId) -> (Vec<u8>, Option<Vec<u8>>) {
    let begin = InodeKey {
        parent,
        name_hash: 0,
    }
    .encode()
    .to_vec();
    let end = parent.checked_add(1).map(|next| {
        InodeKey {
            parent: next,
            name_hash: 0,
        }
        .encode()
        .to_vec()
    });
    (begin, end)
}

// ── timestamps ──────────────────────────────────────────────────────────────

/// Second/nanosecond timestamp as stored in the attribute header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Timespec {
    pub sec: i64,
    pub nsec: u32,
}

impl Timespec {
    /// Current wall-clock time.
    pub fn now() -> Self {
        let now = chrono::Utc::now();
        Self {
            sec: now.timestamp(),
            nsec: now.timestamp_subsec_nanos(),
        }
    }
}

// ── attributes and records ──────────────────────────────────────────────────

/// POSIX attribute block for one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InodeAttrs {
    pub ino: InodeId,
    pub mode: u32,
    pub nlink: u32,
    pub uid: u32,
    pub gid: u32,
    pub size: u64,
    pub atime: Timespec,
    pub mtime: Timespec,
    pub ctime: Timespec,
}

impl InodeAttrs {
    /// Attributes for a freshly created regular file.
    pub fn new_file(ino: InodeId, mode: u32, uid: u32, gid: u32, now: Timespec) -> Self {
        Self {
            ino,
            mode: libc::S_IFREG | (mode & 0o7777),
            nlink: 1,
            uid,
            gid,
            size: 0,
            atime: now,
            mtime: now,
            ctime: now,
        }
    }

    /// Attributes for a freshly created directory. Link count 2 covers the
    /// entry itself and its `.` reference.
    pub fn new_directory(ino: InodeId, mode: u32, uid: u32, gid: u32, now: Timespec) -> Self {
        Self {
            ino,
            mode: libc::S_IFDIR | (mode & 0o7777),
            nlink: 2,
            uid,
            gid,
            size: 0,
            atime: now,
            mtime: now,
            ctime: now,
        }
    }

    /// The root directory's attribute block, carrying the sentinel inode id.
    pub fn root(now: Timespec) -> Self {
        Self::new_directory(ROOT_INODE_ID, 0o755, 0, 0, now)
    }

    /// Whether this entry is a directory.
    pub fn is_dir(&self) -> bool {
        self.mode & libc::S_IFMT == libc::S_IFDIR
    }

    fn encode_into(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.ino.to_le_bytes());
        out.extend_from_slice(&self.mode.to_le_bytes());
        out.extend_from_slice(&self.nlink.to_le_bytes());
        out.extend_from_slice(&self.uid.to_le_bytes());
        out.extend_from_slice(&self.gid.to_le_bytes());
        out.extend_from_slice(&self.size.to_le_bytes());
        for ts in [self.atime, self.mtime, self.ctime] {
            out.extend_from_slice(&ts.sec.to_le_bytes());
            out.extend_from_slice(&ts.nsec.to_le_bytes());
        }
    }

    fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < ATTR_LEN {
            return make_error_msg(
                MetaCode::MALFORMED_RECORD,
                format!("attribute block {} bytes, need {}", bytes.len(), ATTR_LEN),
            );
        }
        let mut r = Reader { buf: bytes, pos: 0 };
        Ok(Self {
            ino: r.u64(),
            mode: r.u32(),
            nlink: r.u32(),
            uid: r.u32(),
            gid: r.u32(),
            size: r.u64(),
            atime: Timespec {
                sec: r.i64(),
                nsec: r.u32(),
            },
            mtime: Timespec {
                sec: r.i64(),
                nsec: r.u32(),
            },
            ctime: Timespec {
                sec: r.i64(),
                nsec: r.u32(),
            },
        })
    }
}

/// Little-endian cursor over a length-checked buffer.
struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl Reader<'_> {
    fn u32(&mut self) -> u32 {
        let mut b = [0u8; 4];
        b.copy_from_slice(&self.buf[self.pos..self.pos + 4]);
        self.pos += 4;
        u32::from_le_bytes(b)
    }

    fn u64(&mut self) -> u64 {
        let mut b = [0u8; 8];
        b.copy_from_slice(&self.buf[self.pos..self.pos + 8]);
        self.pos += 8;
        u64::from_le_bytes(b)
    }

    fn i64(&mut self) -> i64 {
        self.u64() as i64
    }
}

/// One stored entry: attribute header plus the entry's own name.
///
/// The name rides in the value so listings can report real names even
/// though the key only carries a hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InodeRecord {
    pub attrs: InodeAttrs,
    pub name: String,
}

impl InodeRecord {
    pub fn new(attrs: InodeAttrs, name: impl Into<String>) -> Self {
        Self {
            attrs,
            name: name.into(),
        }
    }

    /// Encode to the stored value form: 68-byte header, then the raw name
    /// bytes with no separator.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(ATTR_LEN + self.name.len());
        self.attrs.encode_into(&mut out);
        out.extend_from_slice(self.name.as_bytes());
        out
    }

    /// Decode a stored value, failing with `MalformedRecord` on a short
    /// buffer or a non-UTF-8 name.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let attrs = InodeAttrs::decode(bytes)?;
        let name = match std::str::from_utf8(&bytes[ATTR_LEN..]) {
            Ok(n) => n.to_string(),
            Err(_) => {
                return make_error_msg(
                    MetaCode::MALFORMED_RECORD,
                    format!("entry name for inode {} is not valid UTF-8", attrs.ino),
                )
            }
        };
        Ok(Self { attrs, name })
    }
}
