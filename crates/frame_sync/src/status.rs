use std::fmt;

type Reader<T> = Box<dyn Fn() -> T + Send + Sync>;
type Writer<T> = Box<dyn Fn(T) + Send + Sync>;

/// Read and write capabilities for one host-owned status value.
///
/// Either side may be missing. A missing reader drops the field from frames,
/// a missing writer turns commands for the field into no-ops.
pub struct StatusField<T> {
    reader: Option<Reader<T>>,
    writer: Option<Writer<T>>,
}

impl<T> StatusField<T> {
    pub fn unsupported() -> Self {
        Self {
            reader: None,
            writer: None,
        }
    }

    pub fn with_reader(mut self, read: impl Fn() -> T + Send + Sync + 'static) -> Self {
        self.reader = Some(Box::new(read));
        self
    }

    pub fn with_writer(mut self, write: impl Fn(T) + Send + Sync + 'static) -> Self {
        self.writer = Some(Box::new(write));
        self
    }

    pub fn is_readable(&self) -> bool {
        self.reader.is_some()
    }

    pub fn is_writable(&self) -> bool {
        self.writer.is_some()
    }

    pub fn read(&self) -> Option<T> {
        self.reader.as_ref().map(|read| read())
    }

    /// Returns `false` when no writer is registered.
    pub fn write(&self, value: T) -> bool {
        match &self.writer {
            Some(write) => {
                write(value);
                true
            }
            None => false,
        }
    }
}

impl<T> Default for StatusField<T> {
    fn default() -> Self {
        Self::unsupported()
    }
}

impl<T> fmt::Debug for StatusField<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatusField")
            .field("readable", &self.is_readable())
            .field("writable", &self.is_writable())
            .finish()
    }
}

/// Host hooks for brightness and power. The sync core never stores either value.
#[derive(Debug, Default)]
pub struct StatusHooks {
    pub brightness: StatusField<u8>,
    pub power: StatusField<bool>,
}

impl StatusHooks {
    pub fn read_brightness(mut self, read: impl Fn() -> u8 + Send + Sync + 'static) -> Self {
        self.brightness = self.brightness.with_reader(read);
        self
    }

    pub fn apply_brightness(mut self, write: impl Fn(u8) + Send + Sync + 'static) -> Self {
        self.brightness = self.brightness.with_writer(write);
        self
    }

    pub fn read_power(mut self, read: impl Fn() -> bool + Send + Sync + 'static) -> Self {
        self.power = self.power.with_reader(read);
        self
    }

    pub fn apply_power(mut self, write: impl Fn(bool) + Send + Sync + 'static) -> Self {
        self.power = self.power.with_writer(write);
        self
    }
}
