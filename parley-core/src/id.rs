use crate::macros::id_alias;

// Separate types so a channel id can't be passed where a message id is
// expected, even though both are plain numbers on the wire.
id_alias!(ChannelId);
id_alias!(MessageId);
