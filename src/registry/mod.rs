// Stream registry: name -> Stream map, and per-stream publisher/receiver fan-out

mod stream;

pub use stream::*;
