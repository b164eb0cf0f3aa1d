use log::trace;
use smallvec::SmallVec;
use std::{mem, ops::Range};

use crate::{
    buffer::PagedBuffer,
    decimal::Decimal,
    encoding::{constants::*, descriptor_len, var_uint_len, Serializer, SerializerExt},
    errors::IonError,
    int::Int,
    timestamp::Timestamp,
    util::u64_to_digits,
};

/// A piece of the final output, in order.
#[derive(Clone, Debug)]
enum Segment {
    /// Bytes in the data pages.
    Data(Range<usize>),
    /// A container header in the shared length buffer.
    Header(Range<usize>),
    /// Header of a container that is still open.
    Pending,
}

#[derive(Debug)]
struct Container {
    tid: u8,
    slot: usize,
    content_start: usize,
    annotations: SmallVec<[u32; 4]>,
}

/// How a value's descriptor is formed.
enum Header {
    /// A descriptor byte with no length, as for nulls and booleans.
    Fixed(u8),
    /// A descriptor for a payload of this many bytes.
    Sized(usize),
}

/// Writes values whose symbols are already IDs.
///
/// Scalars are written straight into paged data buffers. A container's header depends on
/// the length of its content, so stepping in leaves a placeholder segment that stepping
/// out fills with a header written to the length buffer shared by all raw writers of one
/// stream. Flushing walks the segments in order.
#[derive(Debug)]
pub(crate) struct RawWriter {
    data: PagedBuffer,
    segments: Vec<Segment>,
    open_from: usize,
    containers: Vec<Container>,
    written: usize,
    field_id: Option<u32>,
    annotations: SmallVec<[u32; 4]>,
}

fn annotation_ids_len(annotations: &[u32]) -> usize {
    annotations.iter().map(|a| var_uint_len(u64::from(*a))).sum()
}

// Bytes a container header adds in front of `content_len` bytes of content.
fn container_header_len(tid: u8, annotations: &[u32], content_len: usize) -> usize {
    let value_len = descriptor_len(tid, content_len) + content_len;
    if annotations.is_empty() {
        return value_len - content_len;
    }
    let annot_len = annotation_ids_len(annotations);
    let wrapper_len = var_uint_len(annot_len as u64) + annot_len + value_len;
    descriptor_len(TID_ANNOTATION, wrapper_len) + wrapper_len - content_len
}

fn put_annotation_wrapper<S: Serializer>(out: &mut S, annotations: &[u32], value_len: usize) {
    let annot_len = annotation_ids_len(annotations);
    let wrapper_len = var_uint_len(annot_len as u64) + annot_len + value_len;
    out.put_descriptor(TID_ANNOTATION, wrapper_len);
    out.put_var_uint(annot_len as u64);
    for a in annotations {
        out.put_var_uint(u64::from(*a));
    }
}

impl RawWriter {
    pub(crate) fn new(page_size: usize) -> Self {
        RawWriter {
            data: PagedBuffer::new(page_size),
            segments: Vec::new(),
            open_from: 0,
            containers: Vec::new(),
            written: 0,
            field_id: None,
            annotations: SmallVec::new(),
        }
    }

    pub(crate) fn depth(&self) -> usize { self.containers.len() }

    pub(crate) fn is_in_struct(&self) -> bool { self.containers.last().map_or(false, |c| c.tid == TID_STRUCT) }

    pub(crate) fn set_field_id(&mut self, sid: u32) { self.field_id = Some(sid) }

    pub(crate) fn add_annotation(&mut self, sid: u32) { self.annotations.push(sid) }

    pub(crate) fn clear_annotations(&mut self) { self.annotations.clear() }

    fn put_data(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
        self.written += bytes.len();
    }

    fn close_data_segment(&mut self) {
        let end = self.data.len();
        if end > self.open_from {
            self.segments.push(Segment::Data(self.open_from..end));
            self.open_from = end;
        }
    }

    fn take_value_prefix(&mut self) -> Result<(Option<u32>, SmallVec<[u32; 4]>), IonError> {
        let field = self.field_id.take();
        let annotations = mem::replace(&mut self.annotations, SmallVec::new());
        if self.is_in_struct() {
            if field.is_none() {
                bail_state!("values inside a struct need a field name")
            }
        } else if field.is_some() {
            bail_state!("a field name was set outside of a struct")
        }
        Ok((field, annotations))
    }

    fn write_value(&mut self, tid: u8, header: Header, body: &[u8]) -> Result<(), IonError> {
        let (field, annotations) = self.take_value_prefix()?;
        let mut head: SmallVec<[u8; 32]> = SmallVec::new();
        if let Some(f) = field {
            head.put_var_uint(u64::from(f));
        }
        if !annotations.is_empty() {
            let header_len = match header {
                Header::Fixed(_) => 1,
                Header::Sized(len) => descriptor_len(tid, len),
            };
            put_annotation_wrapper(&mut head, &annotations, header_len + body.len());
        }
        match header {
            Header::Fixed(b) => head.put_u8(b),
            Header::Sized(len) => head.put_descriptor(tid, len),
        }
        self.put_data(&head);
        self.put_data(body);
        Ok(())
    }

    /// Writes the version marker. Only legal at the top level.
    pub(crate) fn write_ivm(&mut self) -> Result<(), IonError> {
        if self.depth() != 0 {
            bail_state!("version marker inside a container")
        }
        self.put_data(&VERSION_MARKER);
        Ok(())
    }

    pub(crate) fn write_null(&mut self, tid: u8) -> Result<(), IonError> {
        self.write_value(tid, Header::Fixed(make_descriptor(tid, LN_NULL)), &[])
    }

    pub(crate) fn write_bool(&mut self, b: bool) -> Result<(), IonError> {
        let nibble = if b { LN_BOOL_TRUE } else { LN_BOOL_FALSE };
        self.write_value(TID_BOOL, Header::Fixed(make_descriptor(TID_BOOL, nibble)), &[])
    }

    pub(crate) fn write_i64(&mut self, i: i64) -> Result<(), IonError> {
        let tid = if i < 0 { TID_NEG_INT } else { TID_POS_INT };
        let digs = u64_to_digits((i as i128).abs() as u64);
        self.write_value(tid, Header::Sized(digs.len()), &digs)
    }

    pub(crate) fn write_int(&mut self, i: &Int) -> Result<(), IonError> {
        match i {
            Int::I64(i) => self.write_i64(*i),
            Int::Big(_) => {
                let (negative, digs) = i.to_magnitude();
                let tid = if negative { TID_NEG_INT } else { TID_POS_INT };
                self.write_value(tid, Header::Sized(digs.len()), &digs)
            }
        }
    }

    /// Positive zero uses the empty encoding; everything else keeps all 64 bits.
    pub(crate) fn write_f64(&mut self, f: f64) -> Result<(), IonError> {
        let bits = f.to_bits();
        if bits == 0 {
            self.write_value(TID_FLOAT, Header::Sized(0), &[])
        } else {
            self.write_value(TID_FLOAT, Header::Sized(8), &bits.to_be_bytes())
        }
    }

    pub(crate) fn write_f32(&mut self, f: f32) -> Result<(), IonError> {
        let bits = f.to_bits();
        if bits == 0 {
            self.write_value(TID_FLOAT, Header::Sized(0), &[])
        } else {
            self.write_value(TID_FLOAT, Header::Sized(4), &bits.to_be_bytes())
        }
    }

    pub(crate) fn write_decimal(&mut self, d: &Decimal) -> Result<(), IonError> {
        let mut body: SmallVec<[u8; 24]> = SmallVec::new();
        body.put_decimal_body(d);
        self.write_value(TID_DECIMAL, Header::Sized(body.len()), &body)
    }

    pub(crate) fn write_timestamp(&mut self, ts: &Timestamp) -> Result<(), IonError> {
        let mut body: SmallVec<[u8; 32]> = SmallVec::new();
        body.put_timestamp_body(ts);
        self.write_value(TID_TIMESTAMP, Header::Sized(body.len()), &body)
    }

    pub(crate) fn write_symbol_id(&mut self, sid: u32) -> Result<(), IonError> {
        let digs = u64_to_digits(u64::from(sid));
        self.write_value(TID_SYMBOL, Header::Sized(digs.len()), &digs)
    }

    pub(crate) fn write_string(&mut self, s: &str) -> Result<(), IonError> {
        self.write_value(TID_STRING, Header::Sized(s.len()), s.as_bytes())
    }

    /// Writes a blob or clob.
    pub(crate) fn write_lob(&mut self, tid: u8, bytes: &[u8]) -> Result<(), IonError> {
        debug_assert!(tid == TID_BLOB || tid == TID_CLOB);
        self.write_value(tid, Header::Sized(bytes.len()), bytes)
    }

    /// Opens a list, sexp or struct.
    pub(crate) fn step_in(&mut self, tid: u8) -> Result<(), IonError> {
        let (field, annotations) = self.take_value_prefix()?;
        if let Some(f) = field {
            let mut head: SmallVec<[u8; 8]> = SmallVec::new();
            head.put_var_uint(u64::from(f));
            self.put_data(&head);
        }
        self.close_data_segment();
        let slot = self.segments.len();
        self.segments.push(Segment::Pending);
        self.containers.push(Container {
            tid,
            slot,
            content_start: self.written,
            annotations,
        });
        Ok(())
    }

    /// Closes the innermost container, writing its header into `lengths`.
    pub(crate) fn step_out(&mut self, lengths: &mut PagedBuffer) -> Result<(), IonError> {
        let c = match self.containers.pop() {
            Some(c) => c,
            None => bail_state!("cannot step out of the top level"),
        };
        self.field_id = None;
        self.annotations.clear();
        let content_len = self.written - c.content_start;
        self.close_data_segment();
        let start = lengths.len();
        if !c.annotations.is_empty() {
            let value_len = descriptor_len(c.tid, content_len) + content_len;
            put_annotation_wrapper(lengths, &c.annotations, value_len);
        }
        lengths.put_descriptor(c.tid, content_len);
        let end = lengths.len();
        trace!(
            "closed container {:#x} of {} bytes at depth {}",
            c.tid,
            content_len,
            self.containers.len()
        );
        self.segments[c.slot] = Segment::Header(start..end);
        self.written += end - start;
        Ok(())
    }

    /// Seals the buffered output and returns its length.
    ///
    /// # Errors
    ///
    /// [`IonError::InvalidState`] while a container is open.
    pub(crate) fn prepare_flush(&mut self) -> Result<usize, IonError> {
        if !self.containers.is_empty() {
            bail_state!("cannot flush at depth {}", self.containers.len())
        }
        self.close_data_segment();
        Ok(self.written)
    }

    /// Length the output would have if every open container were closed now.
    pub(crate) fn closed_len(&self) -> usize {
        let mut written = self.written;
        for c in self.containers.iter().rev() {
            written += container_header_len(c.tid, &c.annotations, written - c.content_start);
        }
        written
    }

    /// Emits everything written since the last [`RawWriter::finish`], in order.
    pub(crate) fn flush_to<F>(&self, lengths: &PagedBuffer, emit: &mut F) -> Result<(), IonError>
    where
        F: FnMut(&[u8]) -> Result<(), IonError>,
    {
        for seg in &self.segments {
            let slices = match seg {
                Segment::Data(r) => self.data.slices(r.clone()),
                Segment::Header(r) => lengths.slices(r.clone()),
                Segment::Pending => bail_state!("flushing a container that is still open"),
            };
            for s in slices {
                emit(s)?;
            }
        }
        Ok(())
    }

    /// Discards all buffered output.
    pub(crate) fn finish(&mut self) {
        self.data.clear();
        self.segments.clear();
        self.open_from = 0;
        self.containers.clear();
        self.written = 0;
        self.field_id = None;
        self.annotations.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(w: &mut RawWriter, lengths: &PagedBuffer) -> Vec<u8> {
        let total = w.prepare_flush().unwrap();
        let mut out = vec![];
        w.flush_to(lengths, &mut |s: &[u8]| {
            out.extend_from_slice(s);
            Ok(())
        })
        .unwrap();
        assert_eq!(out.len(), total);
        out
    }

    #[test]
    fn scalars() {
        let mut w = RawWriter::new(8);
        let lengths = PagedBuffer::new(8);
        w.write_bool(true).unwrap();
        w.write_null(TID_NULL).unwrap();
        w.write_null(TID_STRING).unwrap();
        w.write_i64(-256).unwrap();
        w.write_i64(0).unwrap();
        w.write_f64(0.0).unwrap();
        w.write_symbol_id(4).unwrap();
        assert_eq!(
            output(&mut w, &lengths),
            vec![0x11, 0x0f, 0x8f, 0x32, 0x01, 0x00, 0x20, 0x40, 0x71, 0x04]
        );
    }

    #[test]
    fn negative_zero_float_keeps_its_bits() {
        let mut w = RawWriter::new(8);
        w.write_f64(-0.0).unwrap();
        let out = output(&mut w, &PagedBuffer::new(8));
        assert_eq!(out[0], 0x48);
        assert_eq!(out[1], 0x80);
    }

    #[test]
    fn nested_containers() {
        let mut w = RawWriter::new(4);
        let mut lengths = PagedBuffer::new(4);
        w.step_in(TID_STRUCT).unwrap();
        w.set_field_id(10);
        w.step_in(TID_LIST).unwrap();
        w.write_i64(1).unwrap();
        w.write_string("hi").unwrap();
        w.step_out(&mut lengths).unwrap();
        w.set_field_id(11);
        w.write_bool(false).unwrap();
        w.step_out(&mut lengths).unwrap();
        assert_eq!(
            output(&mut w, &lengths),
            vec![0xd9, 0x8a, 0xb5, 0x21, 0x01, 0x82, b'h', b'i', 0x8b, 0x10]
        );
    }

    #[test]
    fn annotations() {
        let mut w = RawWriter::new(16);
        let mut lengths = PagedBuffer::new(16);
        w.add_annotation(3);
        w.write_i64(5).unwrap();
        w.add_annotation(3);
        w.step_in(TID_STRUCT).unwrap();
        w.step_out(&mut lengths).unwrap();
        assert_eq!(
            output(&mut w, &lengths),
            vec![0xe4, 0x81, 0x83, 0x21, 0x05, 0xe3, 0x81, 0x83, 0xd0]
        );
    }

    #[test]
    fn long_container_header() {
        let mut w = RawWriter::new(8);
        let mut lengths = PagedBuffer::new(8);
        w.step_in(TID_LIST).unwrap();
        for _ in 0..20 {
            w.write_bool(true).unwrap();
        }
        w.step_out(&mut lengths).unwrap();
        let out = output(&mut w, &lengths);
        assert_eq!(&out[..2], &[0xbe, 0x94]);
        assert_eq!(out.len(), 22);
    }

    #[test]
    fn field_name_rules() {
        let mut w = RawWriter::new(8);
        w.set_field_id(10);
        assert!(w.write_bool(true).is_err());
        w.step_in(TID_STRUCT).unwrap();
        assert!(w.write_bool(true).is_err());
        assert!(w.prepare_flush().is_err());
        let mut lengths = PagedBuffer::new(8);
        w.step_out(&mut lengths).unwrap();
        assert!(w.step_out(&mut lengths).is_err());
    }

    #[test]
    fn closed_len_predicts_step_out() {
        let mut w = RawWriter::new(4);
        let mut lengths = PagedBuffer::new(4);
        w.add_annotation(3);
        w.step_in(TID_STRUCT).unwrap();
        w.set_field_id(7);
        w.step_in(TID_LIST).unwrap();
        for _ in 0..15 {
            w.write_string("ab").unwrap();
        }
        let predicted = w.closed_len();
        w.step_out(&mut lengths).unwrap();
        w.step_out(&mut lengths).unwrap();
        assert_eq!(w.prepare_flush().unwrap(), predicted);
        assert_eq!(output(&mut w, &lengths).len(), predicted);
    }

    #[test]
    fn finish_discards() {
        let mut w = RawWriter::new(8);
        w.write_string("gone").unwrap();
        w.finish();
        assert_eq!(w.prepare_flush().unwrap(), 0);
    }
}
