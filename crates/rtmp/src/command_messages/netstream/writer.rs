//! [`NetStreamCommand`] is always client-originated; the server never writes one back.

use std::io;

use super::NetStreamCommand;
use crate::command_messages::error::CommandError;

impl NetStreamCommand {
    pub fn write(self, _buf: &mut impl io::Write, _transaction_id: f64) -> Result<(), CommandError> {
        Err(CommandError::NotServerWritable("NetStream client command"))
    }
}

#[cfg(test)]
#[cfg_attr(all(test, coverage_nightly), coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn never_server_writable() {
        let err = NetStreamCommand::CloseStream.write(&mut Vec::new(), 1.0).unwrap_err();
        assert!(matches!(err, CommandError::NotServerWritable(_)));
    }
}
