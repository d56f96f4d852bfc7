use crate::credentials::Key;
use crate::error::*;
use ring::constant_time;
use std::io::Write;
use std::ops::Deref;

/// The kind of MAC calculation, corresponding to the first line of the
/// normalized message.
///
/// The first line is what keeps the five MAC contexts separate: a key that
/// signs a request can never be tricked into having signed a response, a
/// bewit, or a bare timestamp with the same remaining lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacType {
    Header,
    Response,
    Bewit,
    Ts,
}

impl MacType {
    fn prefix(self) -> &'static str {
        match self {
            MacType::Header => "hawk.1.header",
            MacType::Response => "hawk.1.response",
            MacType::Bewit => "hawk.1.bewit",
            MacType::Ts => "hawk.1.ts",
        }
    }
}

/// Mac represents a message authentication code, the signature in a Hawk
/// transaction.
///
/// This class supports creating Macs over the normalized request, response
/// and bewit strings, and comparing Macs using a constant-time comparison
/// (thus preventing timing side-channel attacks).
#[derive(Debug, Clone)]
pub struct Mac(Vec<u8>);

impl Mac {
    /// Calculate the MAC for a request, response or bewit.
    ///
    /// The lines are joined with a single LF and the message carries a
    /// trailing LF; `hash` is embedded in standard base64. An absent hash or
    /// ext becomes an empty line, while the app and dlg lines appear only
    /// when `app` is set, matching the normalized form every Hawk
    /// implementation signs.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        mac_type: MacType,
        key: &Key,
        ts: u64,
        nonce: &str,
        method: &str,
        host: &str,
        port: u16,
        path: &str,
        hash: Option<&[u8]>,
        ext: Option<&str>,
        app: Option<&str>,
        dlg: Option<&str>,
    ) -> Result<Mac> {
        let mut buffer: Vec<u8> = vec![];

        write!(buffer, "{}\n", mac_type.prefix())?;
        write!(buffer, "{}\n", ts)?;
        write!(buffer, "{}\n", nonce)?;
        write!(buffer, "{}\n", method)?;
        write!(buffer, "{}\n", path)?;
        write!(buffer, "{}\n", host.to_lowercase())?;
        write!(buffer, "{}\n", port)?;

        match hash {
            Some(h) => write!(buffer, "{}\n", base64::encode(h))?,
            None => write!(buffer, "\n")?,
        }
        write!(buffer, "{}\n", ext.unwrap_or(""))?;

        if let Some(app) = app {
            write!(buffer, "{}\n", app)?;
            write!(buffer, "{}\n", dlg.unwrap_or(""))?;
        }

        log::debug!(
            "calculating {} mac over {} normalized bytes",
            mac_type.prefix(),
            buffer.len()
        );
        Ok(key.sign(&buffer))
    }

    /// Calculate the MAC over a bare timestamp, as carried in the `tsm`
    /// parameter of an expiry challenge.
    pub fn for_timestamp(key: &Key, ts: u64) -> Mac {
        let message = format!("{}\n{}\n", MacType::Ts.prefix(), ts);
        key.sign(message.as_bytes())
    }
}

impl From<Vec<u8>> for Mac {
    fn from(original: Vec<u8>) -> Self {
        Mac(original)
    }
}

impl Deref for Mac {
    type Target = Vec<u8>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<[u8]> for Mac {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl PartialEq for Mac {
    fn eq(&self, other: &Mac) -> bool {
        constant_time::verify_slices_are_equal(&self.0[..], &other.0[..]).is_ok()
    }
}
