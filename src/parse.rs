pub type Input<'a> = &'a [u8];
pub type Result<'a, O> = nom::IResult<Input<'a>, O, nom::error::VerboseError<Input<'a>>>;

/// Implements a `parse` function for an input enum, that allows it to be
/// parsed in terms of a numeric type.
///
/// Shamelessly borrowed from fasterthanlime's executable packer tutorial:
/// https://fasterthanli.me/series/making-our-own-executable-packer
#[macro_export]
macro_rules! impl_parse_for_enum {
    ($type: ident, $number_parser: ident) => {
        impl $type {
            pub fn parse(i: crate::parse::Input) -> crate::parse::Result<Self> {
                use nom::{
                    combinator::map_res,
                    error::{context, ErrorKind},
                    number::complete::$number_parser,
                };
                use std::convert::TryFrom;

                let parser = map_res($number_parser, |x| {
                    Self::try_from(x).map_err(|_| ErrorKind::Alt)
                });
                context(stringify!($type), parser)(i)
            }
        }
    };
}

/// Return the input starting at `offset` bytes into `original_input`. Exif data is full of
/// offsets pointing back into the payload, and a corrupt file can point anywhere, so this fails
/// with a parse error instead of panicking when the offset is out of bounds.
pub fn seek<'a>(original_input: Input<'a>, offset: usize, ctx: &'static str) -> Result<'a, ()> {
    use nom::error::{ContextError, ErrorKind, ParseError, VerboseError};

    if offset > original_input.len() {
        let end = &original_input[original_input.len()..];
        let err = VerboseError::from_error_kind(end, ErrorKind::Eof);
        return Err(nom::Err::Failure(VerboseError::add_context(end, ctx, err)));
    }
    Ok((&original_input[offset..], ()))
}

/// Convert a nom error into a human-readable message. Every context pushed by the parsers shows
/// up as one step of the trace, together with the byte offset at which it failed.
pub fn pretty_error_message(input: Input, e: nom::Err<nom::error::VerboseError<Input>>) -> String {
    use nom::{error::VerboseErrorKind, Offset};

    let e = match e {
        nom::Err::Error(e) | nom::Err::Failure(e) => e,
        nom::Err::Incomplete(needed) => return format!("incomplete input ({:?})", needed),
    };

    e.errors
        .iter()
        .rev()
        .map(|(at, kind)| {
            let offset = input.offset(at);
            match kind {
                VerboseErrorKind::Context(ctx) => format!("{} (at 0x{:x})", ctx, offset),
                VerboseErrorKind::Char(c) => format!("expected {:?} (at 0x{:x})", c, offset),
                VerboseErrorKind::Nom(kind) => format!("{:?} (at 0x{:x})", kind, offset),
            }
        })
        .collect::<Vec<_>>()
        .join(" => ")
}

#[cfg(test)]
mod test {
    use super::{pretty_error_message, seek};
    use nom::{bytes::complete::tag, error::context};

    #[test]
    fn test_seek_out_of_bounds() {
        let data = b"abcd";
        assert!(seek(data, 4, "end").is_ok());
        assert!(seek(data, 5, "past end").is_err());
    }

    #[test]
    fn test_pretty_error_message_includes_context_and_offset() {
        let data = b"xxyz";
        let result = context("Magic bytes", tag("ab"))(&data[2..]);
        let msg = match result {
            Err(e) => pretty_error_message(data, e),
            Ok(_) => panic!("expected the parser to fail"),
        };
        assert!(msg.starts_with("Magic bytes (at 0x2)"), "{}", msg);
    }
}
