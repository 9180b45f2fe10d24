//! Maps built-in and well-known library types to schema fragments.
//!
//! Everything here is pure: a type name goes in, a fragment (or nothing) comes
//! out. Containers and user-declared types are the resolver's business.

use crate::entry::TypeInfo;
use crate::schema::Schema;

/// Primitive types supported
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveType {
    String,
    I8,
    I16,
    I32,
    I64,
    I128,
    Isize,
    U8,
    U16,
    U32,
    U64,
    U128,
    Usize,
    F32,
    F64,
    Bool,
    Char,
}

impl PrimitiveType {
    pub fn parse(type_name: &str) -> Option<Self> {
        match type_name {
            "String" | "str" => Some(PrimitiveType::String),
            "i8" => Some(PrimitiveType::I8),
            "i16" => Some(PrimitiveType::I16),
            "i32" => Some(PrimitiveType::I32),
            "i64" => Some(PrimitiveType::I64),
            "i128" => Some(PrimitiveType::I128),
            "isize" => Some(PrimitiveType::Isize),
            "u8" => Some(PrimitiveType::U8),
            "u16" => Some(PrimitiveType::U16),
            "u32" => Some(PrimitiveType::U32),
            "u64" => Some(PrimitiveType::U64),
            "u128" => Some(PrimitiveType::U128),
            "usize" => Some(PrimitiveType::Usize),
            "f32" => Some(PrimitiveType::F32),
            "f64" => Some(PrimitiveType::F64),
            "bool" => Some(PrimitiveType::Bool),
            "char" => Some(PrimitiveType::Char),
            _ => None,
        }
    }

    pub fn to_schema(self) -> Schema {
        match self {
            PrimitiveType::String | PrimitiveType::Char => Schema::string(),
            PrimitiveType::I8 | PrimitiveType::I16 | PrimitiveType::I32 => {
                Schema::integer().with_format("int32")
            }
            PrimitiveType::I64 | PrimitiveType::I128 | PrimitiveType::Isize => {
                Schema::integer().with_format("int64")
            }
            PrimitiveType::U8 | PrimitiveType::U16 | PrimitiveType::U32 => {
                let mut schema = Schema::integer().with_format("int32");
                schema.minimum = Some(0.0);
                schema
            }
            PrimitiveType::U64 | PrimitiveType::U128 | PrimitiveType::Usize => {
                let mut schema = Schema::integer().with_format("int64");
                schema.minimum = Some(0.0);
                schema
            }
            PrimitiveType::F32 => Schema::number().with_format("float"),
            PrimitiveType::F64 => Schema::number().with_format("double"),
            PrimitiveType::Bool => Schema::boolean(),
        }
    }
}

/// Stateless lookup from type names to schema fragments.
pub struct TypeMapper;

impl TypeMapper {
    /// Language primitives, including the non-zero integer wrappers.
    pub fn map_primitive(ty: &TypeInfo) -> Option<Schema> {
        if let Some(primitive) = PrimitiveType::parse(&ty.name) {
            return Some(primitive.to_schema());
        }
        let inner = ty.name.strip_prefix("NonZero")?;
        let primitive = PrimitiveType::parse(&inner.to_lowercase())?;
        let mut schema = primitive.to_schema();
        schema.minimum = Some(1.0);
        Some(schema)
    }

    /// Well-known library types: dates and times, identifiers, addresses,
    /// decimals, paths and untyped JSON.
    pub fn map_well_known(ty: &TypeInfo) -> Option<Schema> {
        let schema = match ty.name.as_str() {
            "DateTime" | "NaiveDateTime" | "SystemTime" | "OffsetDateTime"
            | "PrimitiveDateTime" | "UtcDateTime" | "Timestamp" | "Zoned" => {
                Schema::string().with_format("date-time")
            }
            "NaiveDate" | "Date" => Schema::string().with_format("date"),
            "NaiveTime" | "Time" => Schema::string().with_format("time"),
            "Duration" => Schema::string().with_format("duration"),
            "Uuid" | "Ulid" => Schema::string().with_format("uuid"),
            "Url" | "Uri" => Schema::string().with_format("uri"),
            "IpAddr" => Schema::string().with_format("ip"),
            "Ipv4Addr" => Schema::string().with_format("ipv4"),
            "Ipv6Addr" => Schema::string().with_format("ipv6"),
            "SocketAddr" => Schema::string(),
            "PathBuf" | "Path" | "OsString" => Schema::string(),
            "Decimal" | "BigDecimal" => Schema::string().with_format("decimal"),
            "Bytes" => Schema::string().with_format("byte"),
            "Email" | "EmailAddress" => Schema::string().with_format("email"),
            "Value" | "JsonValue" => Schema::object(),
            "Map" if ty.generic_args.len() == 2 => Schema::object(),
            _ => return None,
        };
        Some(schema)
    }

    /// Names of containers that serialize as JSON arrays.
    pub fn is_sequence(name: &str) -> bool {
        matches!(
            name,
            "Vec" | "VecDeque" | "LinkedList" | "HashSet" | "BTreeSet" | "BinaryHeap"
                | "IndexSet" | "SmallVec" | "ArrayVec"
        )
    }

    /// Names of containers that serialize as JSON objects keyed by string.
    pub fn is_map(name: &str) -> bool {
        matches!(name, "HashMap" | "BTreeMap" | "IndexMap")
    }

    /// Wrappers that serialize exactly like their first type argument.
    pub fn is_transparent(name: &str) -> bool {
        matches!(
            name,
            "Box" | "Arc" | "Rc" | "Cow" | "RefCell" | "Cell" | "Mutex" | "RwLock" | "Wrapping"
                | "Reverse"
        )
    }
}
