pub(crate) mod audio;
pub(crate) mod clip;
pub(crate) mod decode;
pub(crate) mod media;
pub(crate) mod resolver;
