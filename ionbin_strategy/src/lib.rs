use ionbin::{
    decimal::{Decimal, MAX_MAGNITUDE, MAX_SCALE},
    encoding::ByteSource,
    timestamp::Timestamp,
    BinaryReader, BinaryWriter, IonError, IonType,
};
use num_bigint::BigInt;
use num_traits::Num;
use proptest::prelude::*;

/// A value tree mirroring what the writer can produce, used to compare what was written
/// with what is read back.
#[derive(Clone, Debug, PartialEq)]
pub struct Sample {
    pub annotations: Vec<String>,
    pub value: Value,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null(IonType),
    Bool(bool),
    Int(BigInt),
    Float(f64),
    Decimal(Decimal),
    Timestamp(Timestamp),
    Symbol(String),
    String(String),
    Clob(Vec<u8>),
    Blob(Vec<u8>),
    List(Vec<Sample>),
    Sexp(Vec<Sample>),
    Struct(Vec<(String, Sample)>),
}

/// arbitrary Integer for use with proptest
pub fn arb_bigint() -> impl Strategy<Value = BigInt> {
    prop_oneof![
        any::<i64>().prop_map(BigInt::from),
        "-?1[0-1]{63,}".prop_map(|n| -> BigInt { BigInt::from_str_radix(&n, 2).unwrap() }),
    ]
}

/// arbitrary Decimal within the supported scale and magnitude
pub fn arb_decimal() -> impl Strategy<Value = Decimal> {
    let magnitude = prop_oneof![
        any::<u32>().prop_map(u128::from),
        (any::<u64>(), any::<u64>())
            .prop_map(|(hi, lo)| ((u128::from(hi) << 64) | u128::from(lo)) & MAX_MAGNITUDE),
    ];
    (any::<bool>(), magnitude, 0..MAX_SCALE + 1)
        .prop_map(|(neg, mag, scale)| Decimal::from_parts(neg, mag, scale).unwrap())
}

/// arbitrary Timestamp of any precision
pub fn arb_timestamp() -> impl Strategy<Value = Timestamp> {
    let offset = prop_oneof![Just(None), (-1439i32..1440).prop_map(Some)];
    (
        (1u16..10_000, 1u8..13, 1u8..29),
        (0u8..24, 0u8..60, 0u8..60),
        offset,
        (0usize..6, 1u32..10, any::<u64>()),
    )
        .prop_map(|((y, mo, d), (h, mi, s), off, (precision, scale, frac))| {
            match precision {
                0 => Timestamp::with_year(y),
                1 => Timestamp::with_month(y, mo),
                2 => Timestamp::with_day(y, mo, d),
                3 => Timestamp::with_minute(y, mo, d, h, mi, off),
                4 => Timestamp::with_second(y, mo, d, h, mi, s, off),
                _ => {
                    let mag = u128::from(frac) % 10u128.pow(scale);
                    let fraction = Decimal::from_parts(false, mag, scale).unwrap();
                    Timestamp::with_fraction(y, mo, d, h, mi, s, fraction, off)
                }
            }
            .unwrap()
        })
}

/// symbol text drawn from a small alphabet so that symbols repeat
pub fn arb_symbol_text() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-e]{1,3}",
        Just("name".to_string()),
        Just("symbols".to_string()),
    ]
}

fn arb_null_type() -> impl Strategy<Value = IonType> {
    prop::sample::select(vec![
        IonType::Null,
        IonType::Bool,
        IonType::Int,
        IonType::Float,
        IonType::Decimal,
        IonType::Timestamp,
        IonType::Symbol,
        IonType::String,
        IonType::Clob,
        IonType::Blob,
        IonType::List,
        IonType::Sexp,
        IonType::Struct,
    ])
}

fn arb_annotations() -> impl Strategy<Value = Vec<String>> { prop::collection::vec(arb_symbol_text(), 0..3) }

/// arbitrary Sample for use with proptest
pub fn arb_sample() -> impl Strategy<Value = Sample> {
    let leaf_value = prop_oneof![
        arb_null_type().prop_map(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        arb_bigint().prop_map(Value::Int),
        any::<f64>()
            .prop_filter("NaN never compares equal", |f| !f.is_nan())
            .prop_map(Value::Float),
        arb_decimal().prop_map(Value::Decimal),
        arb_timestamp().prop_map(Value::Timestamp),
        arb_symbol_text().prop_map(Value::Symbol),
        any::<String>().prop_map(Value::String),
        prop::collection::vec(any::<u8>(), 0..40).prop_map(Value::Clob),
        prop::collection::vec(any::<u8>(), 0..40).prop_map(Value::Blob),
    ];
    let leaf = (arb_annotations(), leaf_value).prop_map(|(annotations, value)| Sample { annotations, value });
    leaf.prop_recursive(
        4,  // max depth
        32, // max nodes
        6,  // max items per collection
        |inner| {
            let container = prop_oneof![
                prop::collection::vec(inner.clone(), 0..6).prop_map(Value::List),
                prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Sexp),
                prop::collection::vec((arb_symbol_text(), inner), 0..6).prop_map(Value::Struct),
            ];
            (arb_annotations(), container).prop_map(|(annotations, value)| Sample { annotations, value })
        },
    )
}

/// Writes `s` as the next value.
pub fn write_sample(w: &mut BinaryWriter, s: &Sample) -> Result<(), IonError> {
    for a in &s.annotations {
        w.add_annotation(a)?;
    }
    match &s.value {
        Value::Null(ty) => w.write_typed_null(*ty),
        Value::Bool(b) => w.write_bool(*b),
        Value::Int(i) => w.write_bigint(i),
        Value::Float(f) => w.write_float(*f),
        Value::Decimal(d) => w.write_decimal(d),
        Value::Timestamp(ts) => w.write_timestamp(ts),
        Value::Symbol(text) => w.write_symbol(text),
        Value::String(text) => w.write_string(text),
        Value::Clob(bytes) => w.write_clob(bytes),
        Value::Blob(bytes) => w.write_blob(bytes),
        Value::List(items) | Value::Sexp(items) => {
            let ty = match s.value {
                Value::List(_) => IonType::List,
                _ => IonType::Sexp,
            };
            w.step_in(ty)?;
            for item in items {
                write_sample(w, item)?;
            }
            w.step_out()
        }
        Value::Struct(fields) => {
            w.step_in(IonType::Struct)?;
            for (name, item) in fields {
                w.set_field_name(name)?;
                write_sample(w, item)?;
            }
            w.step_out()
        }
    }
}

/// Reads the reader's current value, of type `ty`, as a sample.
pub fn read_sample<S: ByteSource>(r: &mut BinaryReader<S>, ty: IonType) -> Result<Sample, IonError> {
    let annotations = r
        .annotations()
        .into_iter()
        .map(|t| t.text.unwrap_or_default())
        .collect();
    let value = if r.is_null() {
        Value::Null(ty)
    } else {
        match ty {
            IonType::Null => Value::Null(IonType::Null),
            IonType::Bool => Value::Bool(r.bool_value()?),
            IonType::Int => Value::Int(r.bigint_value()?),
            IonType::Float => Value::Float(r.float_value()?),
            IonType::Decimal => Value::Decimal(r.decimal_value()?),
            IonType::Timestamp => Value::Timestamp(r.timestamp_value()?),
            IonType::Symbol => Value::Symbol(r.string_value()?),
            IonType::String => Value::String(r.string_value()?),
            IonType::Clob => Value::Clob(r.lob_bytes()?.to_vec()),
            IonType::Blob => Value::Blob(r.lob_bytes()?.to_vec()),
            IonType::List | IonType::Sexp => {
                r.step_in()?;
                let items = read_values(r)?;
                r.step_out()?;
                if ty == IonType::List {
                    Value::List(items)
                } else {
                    Value::Sexp(items)
                }
            }
            IonType::Struct => {
                r.step_in()?;
                let mut fields = Vec::new();
                while let Some(ty) = r.next()? {
                    let name = r.field_name().unwrap_or_default().to_string();
                    fields.push((name, read_sample(r, ty)?));
                }
                r.step_out()?;
                Value::Struct(fields)
            }
        }
    };
    Ok(Sample { annotations, value })
}

/// Reads every remaining value at the reader's current depth.
pub fn read_values<S: ByteSource>(r: &mut BinaryReader<S>) -> Result<Vec<Sample>, IonError> {
    let mut out = Vec::new();
    while let Some(ty) = r.next()? {
        out.push(read_sample(r, ty)?);
    }
    Ok(out)
}
