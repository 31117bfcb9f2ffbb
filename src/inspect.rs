//! Stream decoding and formatted output for `agentx-inspect`.
//!
//! A captured byte stream is split into PDUs with [`split_frame`], each one
//! decoded with [`decode_pdu`], and the result rendered as text or JSON.

use serde::Serialize;

use crate::{
    agentx::{decode_pdu, split_frame, AgentXError, Pdu, PduHeader, SearchRange},
    value::VarBind,
};

/// Output format for inspection reports.
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output for machine consumption.
    Json,
}

/// One decoded PDU and where it started in the stream.
#[derive(Debug, Serialize)]
pub struct Frame {
    pub offset: usize,
    pub header: PduHeader,
    pub pdu: Pdu,
}

/// The first decode failure of a non-strict run.
#[derive(Debug, Serialize)]
pub struct FrameError {
    pub offset: usize,
    pub message: String,
}

/// Everything decoded from one stream.
#[derive(Debug, Serialize)]
pub struct InspectReport {
    pub total_bytes: usize,
    pub frames: Vec<Frame>,
    /// Set when decoding stopped early on malformed input.
    pub error: Option<FrameError>,
}

/// Decodes every PDU in `buf`.
///
/// # Errors
/// In `strict` mode the first decode failure is returned. Otherwise decoding
/// stops there and the failure is recorded in [`InspectReport::error`].
pub fn decode_stream(buf: &[u8], strict: bool) -> Result<InspectReport, AgentXError> {
    let mut frames = Vec::new();
    let mut offset = 0;

    while offset < buf.len() {
        match decode_frame(&buf[offset..]) {
            Ok((header, pdu, consumed)) => {
                frames.push(Frame {
                    offset,
                    header,
                    pdu,
                });
                offset += consumed;
            }
            Err(e) if strict => return Err(e),
            Err(e) => {
                log::warn!("Stopping at offset {}: {}", offset, e);
                return Ok(InspectReport {
                    total_bytes: buf.len(),
                    frames,
                    error: Some(FrameError {
                        offset,
                        message: e.to_string(),
                    }),
                });
            }
        }
    }

    log::info!("Decoded {} PDUs from {} bytes", frames.len(), buf.len());
    Ok(InspectReport {
        total_bytes: buf.len(),
        frames,
        error: None,
    })
}

fn decode_frame(buf: &[u8]) -> Result<(PduHeader, Pdu, usize), AgentXError> {
    let (header, payload, rest) = split_frame(buf)?;
    let pdu = decode_pdu(&header, payload)?;
    Ok((header, pdu, buf.len() - rest.len()))
}

impl InspectReport {
    /// Prints the report in the given format.
    pub fn print(&self, format: OutputFormat) {
        match format {
            OutputFormat::Text => print!("{}", self.render_text()),
            OutputFormat::Json => self.print_json(),
        }
    }

    fn print_json(&self) {
        match serde_json::to_string_pretty(self) {
            Ok(json) => println!("{}", json),
            Err(e) => log::error!("Cannot serialize report: {}", e),
        }
    }

    /// Renders the text form of the report.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        for (i, frame) in self.frames.iter().enumerate() {
            let h = &frame.header;
            out.push_str(&format!(
                "#{} @{} {} session={} transaction={} packet={} flags={:?} payload={}B\n",
                i,
                frame.offset,
                h.pdu_type,
                h.session_id,
                h.transaction_id,
                h.packet_id,
                h.flags,
                h.payload_length
            ));
            for line in body_lines(&frame.pdu) {
                out.push_str("    ");
                out.push_str(&line);
                out.push('\n');
            }
        }
        out.push_str(&format!(
            "--- {} PDUs in {} bytes ---\n",
            self.frames.len(),
            self.total_bytes
        ));
        if let Some(e) = &self.error {
            out.push_str(&format!("Error at offset {}: {}\n", e.offset, e.message));
        }
        out
    }
}

fn range_line(range: &SearchRange) -> String {
    let end = range
        .end
        .as_ref()
        .map_or_else(|| "(unbounded)".to_string(), |e| e.to_string());
    let open = if range.include { "[" } else { "(" };
    format!("range {}{} .. {}", open, range.start, end)
}

fn varbind_lines(varbinds: &[VarBind]) -> impl Iterator<Item = String> + '_ {
    varbinds.iter().map(|vb| vb.to_string())
}

fn body_lines(pdu: &Pdu) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(context) = pdu.context() {
        lines.push(format!("context \"{}\"", String::from_utf8_lossy(context)));
    }
    match pdu {
        Pdu::Open(p) => {
            let id = p.id.as_ref().map_or_else(|| "null".to_string(), |o| o.to_string());
            lines.push(format!(
                "timeout={}s id={} description=\"{}\"",
                p.timeout,
                id,
                String::from_utf8_lossy(&p.description)
            ));
        }
        Pdu::Close(p) => lines.push(format!("reason={:?}", p.reason)),
        Pdu::Register(p) => {
            lines.push(format!(
                "subtree={} priority={} timeout={}s",
                p.subtree, p.priority, p.timeout
            ));
            if let Some(bound) = p.upper_bound {
                lines.push(format!("range_subid={} upper_bound={}", p.range_subid, bound));
            }
        }
        Pdu::Unregister(p) => {
            lines.push(format!("subtree={} priority={}", p.subtree, p.priority));
            if let Some(bound) = p.upper_bound {
                lines.push(format!("range_subid={} upper_bound={}", p.range_subid, bound));
            }
        }
        Pdu::Get(p) | Pdu::GetNext(p) => lines.extend(p.ranges.iter().map(range_line)),
        Pdu::GetBulk(p) => {
            lines.push(format!(
                "non_repeaters={} max_repetitions={}",
                p.non_repeaters, p.max_repetitions
            ));
            lines.extend(p.ranges.iter().map(range_line));
        }
        Pdu::TestSet(p) => lines.extend(varbind_lines(&p.varbinds)),
        Pdu::Notify(p) => lines.extend(varbind_lines(&p.varbinds)),
        Pdu::IndexAllocate(p) | Pdu::IndexDeallocate(p) => {
            lines.push(format!("new_index={} any_index={}", p.new_index, p.any_index));
            lines.extend(varbind_lines(&p.varbinds));
        }
        Pdu::AddAgentCaps(p) => lines.push(format!(
            "id={} description=\"{}\"",
            p.id,
            String::from_utf8_lossy(&p.description)
        )),
        Pdu::RemoveAgentCaps(p) => lines.push(format!("id={}", p.id)),
        Pdu::Response(p) => {
            let error = match p.error_kind() {
                Some(kind) => format!("{:?}", kind),
                None => p.error.to_string(),
            };
            lines.push(format!(
                "sys_uptime={} error={} index={}",
                p.sys_uptime, error, p.index
            ));
            lines.extend(varbind_lines(&p.varbinds));
        }
        Pdu::Ping(_) | Pdu::CommitSet | Pdu::UndoSet | Pdu::CleanupSet => {}
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        agentx::{encode_ping_pdu, encode_response_pdu, PduType},
        value::Value,
    };

    fn stream() -> Vec<u8> {
        let vb = VarBind::new("1.3.6.1.2.1.1.5.0".parse().unwrap(), Value::string("host"));
        let mut buf = encode_ping_pdu(1, 1, 1).unwrap();
        buf.extend(encode_response_pdu(1, 1, 1, 500, 0, 0, &[vb]).unwrap());
        buf
    }

    #[test]
    fn test_decode_stream() {
        let buf = stream();
        let report = decode_stream(&buf, true).unwrap();
        assert_eq!(report.frames.len(), 2);
        assert_eq!(report.frames[0].header.pdu_type, PduType::Ping);
        assert_eq!(report.frames[1].offset, 20);
        assert!(report.error.is_none());
    }

    #[test]
    fn test_truncated_stream() {
        let buf = stream();
        let cut = &buf[..buf.len() - 3];

        assert!(matches!(
            decode_stream(cut, true),
            Err(AgentXError::Truncated { .. })
        ));

        let report = decode_stream(cut, false).unwrap();
        assert_eq!(report.frames.len(), 1);
        let error = report.error.unwrap();
        assert_eq!(error.offset, 20);
        assert!(error.message.contains("Truncated"));
    }

    #[test]
    fn test_text_output() {
        let report = decode_stream(&stream(), false).unwrap();
        let text = report.render_text();
        assert!(text.contains("#0 @0 Ping session=1"));
        assert!(text.contains("sys_uptime=500 error=NoError index=0"));
        assert!(text.contains("1.3.6.1.2.1.1.5.0 = STRING: \"host\""));
        assert!(text.contains("--- 2 PDUs in"));
        report.print(OutputFormat::Text);
    }

    #[test]
    fn test_json_output() {
        let report = decode_stream(&stream(), false).unwrap();
        let json: serde_json::Value = serde_json::to_value(&report).unwrap();
        assert_eq!(json["frames"].as_array().unwrap().len(), 2);
        assert_eq!(json["frames"][1]["header"]["pdu_type"], "Response");
        assert_eq!(
            json["frames"][1]["pdu"]["Response"]["varbinds"][0]["oid"],
            "1.3.6.1.2.1.1.5.0"
        );
        report.print(OutputFormat::Json);
    }
}
