pub mod yt_dlp_lister;
