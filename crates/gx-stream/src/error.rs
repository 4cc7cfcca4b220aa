use easyerr::Error;

#[derive(Debug, Error)]
pub enum StreamError {
    #[error("display-list byte limit reached mid-command at offset {offset}")]
    TruncatedStream { offset: usize },
    #[error("display-list command tag 0x{tag:02X} at offset {offset} has no defined decoding")]
    UnknownCommand { tag: u8, offset: usize },
}
