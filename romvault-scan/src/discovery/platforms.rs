//! Platform table
//!
//! Maps platform folder names to canonical platforms and their ids at each
//! metadata provider. Folder lookup is exact and case-sensitive. Config
//! bindings (`folder → slug`) and versions (`folder → parent slug`) are
//! consulted before the built-in table.

use romvault_common::models::ProviderId;
use serde::Serialize;
use std::collections::BTreeMap;

/// Platform ids at each provider
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProviderPlatformIds {
    pub igdb: Option<u32>,
    pub moby: Option<u32>,
    pub ss: Option<u32>,
    /// RetroAchievements console id
    pub ra: Option<u32>,
}

impl ProviderPlatformIds {
    pub fn get(&self, provider: ProviderId) -> Option<u32> {
        match provider {
            ProviderId::Igdb => self.igdb,
            ProviderId::Moby => self.moby,
            ProviderId::Ss => self.ss,
            ProviderId::Ra => self.ra,
            // Hash lookups are platform independent
            ProviderId::Hasheous => None,
        }
    }
}

/// A canonical platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlatformInfo {
    pub slug: String,
    pub name: String,
    pub ids: ProviderPlatformIds,
}

struct PlatformDef {
    slug: &'static str,
    name: &'static str,
    aliases: &'static [&'static str],
    igdb: Option<u32>,
    moby: Option<u32>,
    ss: Option<u32>,
    ra: Option<u32>,
}

macro_rules! platform {
    ($slug:expr, $name:expr, [$($alias:expr),*], $igdb:expr, $moby:expr, $ss:expr, $ra:expr) => {
        PlatformDef {
            slug: $slug,
            name: $name,
            aliases: &[$($alias),*],
            igdb: $igdb,
            moby: $moby,
            ss: $ss,
            ra: $ra,
        }
    };
}

#[rustfmt::skip]
static BUILTIN_PLATFORMS: &[PlatformDef] = &[
    platform!("1292-advanced-programmable-video-system", "1292 Advanced Programmable Video System", ["1292apvs"], Some(139), Some(253), None, None),
    platform!("3do", "3DO Interactive Multiplayer", ["3DO"], Some(50), Some(35), Some(29), Some(43)),
    platform!("3ds", "Nintendo 3DS", ["n3ds"], Some(37), Some(101), Some(17), Some(62)),
    platform!("abc-80", "ABC 80", ["abc80"], None, Some(318), None, None),
    platform!("acorn-archimedes", "Acorn Archimedes", ["acornarchimedes"], Some(116), Some(117), None, None),
    platform!("acorn-electron", "Acorn Electron", ["acornelectron", "electron"], Some(134), Some(93), Some(85), None),
    platform!("acpc", "Amstrad CPC", ["amstradcpc"], Some(25), Some(60), Some(60), Some(37)),
    platform!("adventure-vision", "Adventure Vision", ["advision"], None, Some(210), None, None),
    platform!("airconsole", "AirConsole", [], Some(389), Some(305), None, None),
    platform!("alice-3290", "Alice 32/90", ["alice3290"], None, Some(194), None, None),
    platform!("altair-680", "Altair 680", ["altair680"], None, Some(265), None, None),
    platform!("altair-8800", "Altair 8800", ["altair8800"], None, Some(222), None, None),
    platform!("amazon-fire-tv", "Amazon Fire TV", ["amazonfiretv"], Some(132), Some(159), None, None),
    platform!("amazonalexa", "Amazon Alexa", [], None, Some(237), None, None),
    platform!("amiga", "Amiga", [], Some(16), Some(19), Some(64), None),
    platform!("amiga-cd32", "Amiga CD32", ["amigacd32"], Some(114), Some(56), Some(134), None),
    platform!("amstrad-pcw", "Amstrad PCW", ["amstradpcw"], Some(154), Some(136), None, None),
    platform!("android", "Android", [], Some(34), Some(91), Some(63), None),
    platform!("antstream", "Antstream", [], None, Some(286), None, None),
    platform!("apf", "APF MP1000/Imagination Machine", [], None, Some(213), None, None),
    platform!("apple-i", "Apple I", ["apple"], None, Some(245), None, None),
    platform!("apple-iigs", "Apple IIGS", ["apple2gs"], Some(115), Some(51), Some(217), None),
    platform!("appleii", "Apple II", ["apple2"], Some(75), Some(31), Some(86), Some(38)),
    platform!("arcade", "Arcade", ["mame", "fbneo"], Some(52), Some(143), Some(75), Some(27)),
    platform!("arcadia-2001", "Arcadia 2001", ["arcadia"], Some(473), Some(162), Some(94), None),
    platform!("arduboy", "Arduboy", [], Some(438), Some(215), Some(263), Some(71)),
    platform!("astral-2000", "Astral 2000", ["astral2000"], None, Some(241), None, None),
    platform!("astrocade", "Bally Astrocade", ["bally-astrocade"], Some(91), Some(160), Some(44), None),
    platform!("atari-st", "Atari ST/STE", ["atarist"], Some(63), Some(24), Some(42), Some(36)),
    platform!("atari-vcs", "Atari VCS", ["atarivcs"], None, Some(319), None, None),
    platform!("atari2600", "Atari 2600", ["a2600"], Some(59), Some(28), Some(26), Some(25)),
    platform!("atari5200", "Atari 5200", ["atari-5200"], Some(66), Some(33), Some(40), None),
    platform!("atari7800", "Atari 7800", ["a7800"], Some(60), Some(34), Some(41), Some(51)),
    platform!("atari8bit", "Atari 8-bit", ["atari-8-bit"], Some(65), Some(39), Some(43), None),
    platform!("atom", "Atom", [], None, Some(129), Some(36), None),
    platform!("bada", "bada", [], None, Some(99), None, None),
    platform!("bbcmicro", "BBC Microcomputer System", ["bbc-micro"], Some(69), Some(92), Some(37), None),
    platform!("beos", "BeOS", [], None, Some(165), None, None),
    platform!("blackberry", "BlackBerry OS", [], Some(73), Some(90), None, None),
    platform!("blacknut", "Blacknut", [], None, Some(290), None, None),
    platform!("blu-ray-player", "Blu-ray Player", ["bluray", "blu-ray-disc-player"], Some(239), Some(168), None, None),
    platform!("brew", "BREW", [], None, Some(63), None, None),
    platform!("browser", "Web browser", [], Some(82), Some(84), None, None),
    platform!("bubble", "Bubble", [], None, Some(231), None, None),
    platform!("c-plus-4", "Commodore Plus/4", ["cplus4"], Some(94), Some(115), Some(99), None),
    platform!("c128", "Commodore 128", [], None, Some(61), Some(66), None),
    platform!("c16", "Commodore 16", [], Some(93), Some(115), Some(99), None),
    platform!("c64", "Commodore C64/128/MAX", [], Some(15), Some(27), Some(66), None),
    platform!("camputers-lynx", "Camputers Lynx", ["camplynx"], None, Some(154), Some(88), None),
    platform!("casio-loopy", "Casio Loopy", ["loopy"], Some(380), Some(124), Some(98), None),
    platform!("casio-programmable-calculator", "Casio Programmable Calculator", ["casiocalc"], None, Some(306), None, None),
    platform!("casio-pv-1000", "Casio PV-1000", ["pv1000"], None, Some(125), Some(74), None),
    platform!("cd-i", "CD-i", ["cdi"], None, Some(73), Some(133), None),
    platform!("cdtv", "CDTV", [], None, Some(83), Some(129), None),
    platform!("champion-2711", "Champion 2711", ["champion2711"], None, Some(298), None, None),
    platform!("channel-f", "Channel F", ["channelf"], None, Some(76), Some(80), Some(57)),
    platform!("clickstart", "ClickStart", [], None, Some(188), None, None),
    platform!("colecoadam", "Coleco Adam", [], None, Some(156), Some(89), None),
    platform!("colecovision", "ColecoVision", [], Some(68), Some(29), Some(48), Some(44)),
    platform!("colour-genie", "Colour Genie", ["colourgenie"], None, Some(197), Some(92), None),
    platform!("commodore-16-plus4", "Commodore 16, Plus/4", ["c16plus4"], None, Some(115), None, None),
    platform!("compucolor-i", "Compucolor I", ["compucolor"], None, Some(243), None, None),
    platform!("compucolor-ii", "Compucolor II", ["compucolor2"], None, Some(198), None, None),
    platform!("compucorp-programmable-calculator", "Compucorp Programmable Calculator", ["compucorpcalc"], None, Some(238), None, None),
    platform!("cpet", "Commodore PET", [], Some(90), Some(77), Some(240), None),
    platform!("cpm", "CP/M", [], None, Some(261), None, None),
    platform!("creativision", "CreatiVision", [], None, Some(212), Some(241), None),
    platform!("cybervision", "Cybervision", [], None, Some(301), None, None),
    platform!("danger-os", "Danger OS", ["dangeros"], None, Some(285), None, None),
    platform!("dc", "Dreamcast", ["dreamcast"], Some(23), Some(8), Some(23), Some(40)),
    platform!("dedicated-console", "Dedicated console", ["dedicatedconsole"], None, Some(204), None, None),
    platform!("dedicated-handheld", "Dedicated handheld", ["dedicatedhandheld"], None, Some(205), None, None),
    platform!("didj", "Didj", [], None, Some(184), None, None),
    platform!("digiblast", "Digiblast", [], Some(486), Some(187), None, None),
    platform!("doja", "DoJa", [], None, Some(72), None, None),
    platform!("dos", "DOS", [], Some(13), Some(2), Some(135), None),
    platform!("dragon-32-slash-64", "Dragon 32/64", ["dragon32", "dragon-3264"], Some(153), Some(79), Some(91), None),
    platform!("dvd-player", "DVD Player", ["dvd"], Some(238), Some(166), None, None),
    platform!("ecd-micromind", "ECD Micromind", ["micromind"], None, Some(269), None, None),
    platform!("enterprise", "Enterprise", [], None, Some(161), None, None),
    platform!("epoch-cassette-vision", "Epoch Cassette Vision", ["ecv"], Some(375), Some(137), None, None),
    platform!("epoch-game-pocket-computer", "Epoch Game Pocket Computer", ["egpc"], None, Some(139), Some(95), None),
    platform!("epoch-super-cassette-vision", "Epoch Super Cassette Vision", ["scv"], Some(376), Some(138), Some(67), None),
    platform!("evercade", "Evercade", [], Some(309), Some(284), None, None),
    platform!("exelvision", "Exelvision", [], None, Some(195), Some(96), None),
    platform!("exen", "ExEn", [], None, Some(70), None, None),
    platform!("exidy-sorcerer", "Exidy Sorcerer", ["exidysorcerer"], Some(236), Some(176), Some(165), None),
    platform!("fds", "Family Computer Disk System", [], Some(51), None, Some(106), None),
    platform!("fire-os", "Fire OS", ["fireos"], None, Some(159), None, None),
    platform!("fm-7", "FM-7", ["fm7"], Some(152), Some(126), Some(97), None),
    platform!("fm-towns", "FM Towns", ["fmtowns"], Some(118), Some(102), Some(253), None),
    platform!("fred-cosmac", "COSMAC", ["cosmac"], None, Some(216), None, None),
    platform!("freebox", "Freebox", [], None, Some(268), None, None),
    platform!("g-and-w", "Game & Watch", ["gameandwatch"], Some(307), Some(205), Some(52), Some(60)),
    platform!("g-cluster", "G-cluster", ["gcluster"], None, Some(302), None, None),
    platform!("galaksija", "Galaksija", [], None, Some(236), None, None),
    platform!("game-dot-com", "Game.com", ["gamecom", "game-com"], Some(379), Some(50), Some(121), None),
    platform!("game-wave", "Game Wave", ["gamewave"], None, Some(104), None, None),
    platform!("gamegear", "Sega Game Gear", ["gg"], Some(35), Some(25), Some(21), Some(15)),
    platform!("gamestick", "GameStick", [], None, Some(155), None, None),
    platform!("gb", "Game Boy", ["gameboy"], Some(33), Some(10), Some(9), Some(4)),
    platform!("gba", "Game Boy Advance", ["gameboy-advance"], Some(24), Some(12), Some(12), Some(5)),
    platform!("gbc", "Game Boy Color", ["gameboy-color"], Some(22), Some(11), Some(10), Some(6)),
    platform!("genesis", "Sega Mega Drive/Genesis", ["megadrive", "md", "genesis-slash-megadrive"], Some(29), Some(16), Some(1), Some(1)),
    platform!("gimini", "GIMINI", [], None, Some(251), None, None),
    platform!("gizmondo", "Gizmondo", [], Some(474), Some(55), None, None),
    platform!("gloud", "Gloud", [], None, Some(292), None, None),
    platform!("glulx", "Glulx", [], None, Some(172), None, None),
    platform!("gnex", "GNEX", [], None, Some(258), None, None),
    platform!("gp2x", "GP2X", [], None, Some(122), None, None),
    platform!("gp2x-wiz", "GP2X Wiz", ["gp2xwiz"], None, Some(123), None, None),
    platform!("gp32", "GP32", [], None, Some(108), Some(101), None),
    platform!("gvm", "GVM", [], None, Some(257), None, None),
    platform!("hd-dvd-player", "HD DVD Player", ["hddvd"], None, Some(167), None, None),
    platform!("heathkit-h11", "Heathkit H11", ["heathkith11"], None, Some(248), None, None),
    platform!("heathzenith", "Heath/Zenith H8/H89", [], None, Some(262), None, None),
    platform!("hitachi-s1", "Hitachi S1", ["hitachis1"], None, Some(274), None, None),
    platform!("hp-9800", "HP 9800", ["hp9800"], None, Some(219), None, None),
    platform!("hp-programmable-calculator", "HP Programmable Calculator", ["hpcalc"], None, Some(234), None, None),
    platform!("hugo", "Hugo", [], None, Some(170), None, None),
    platform!("hyperscan", "HyperScan", [], Some(407), Some(192), None, None),
    platform!("ibm-5100", "IBM 5100", ["ibm5100"], None, Some(250), None, None),
    platform!("ideal-computer", "Ideal-Computer", ["idealcomputer"], None, Some(252), None, None),
    platform!("iircade", "iiRcade", [], None, Some(314), None, None),
    platform!("intel-8008", "Intel 8008", ["intel8008"], None, Some(224), None, None),
    platform!("intel-8080", "Intel 8080", ["intel8080"], None, Some(225), None, None),
    platform!("intel-8086", "Intel 8086 / 8088", ["intel8086"], None, Some(317), None, None),
    platform!("intellivision", "Intellivision", [], Some(67), Some(30), Some(115), Some(45)),
    platform!("interact-model-one", "Interact Model One", ["interactm1"], None, Some(295), None, None),
    platform!("interton-video-2000", "Interton Video 2000", ["intertonv2000"], None, Some(221), None, None),
    platform!("ios", "iOS", [], Some(39), Some(86), None, None),
    platform!("ipad", "iPad", [], None, Some(96), None, None),
    platform!("iphone", "iPhone", [], None, Some(86), None, None),
    platform!("ipod-classic", "iPod Classic", ["ipod"], None, Some(80), None, None),
    platform!("j2me", "J2ME", [], None, Some(64), None, None),
    platform!("jaguar", "Atari Jaguar", [], Some(62), Some(17), Some(27), Some(17)),
    platform!("jolt", "Jolt", [], None, Some(247), None, None),
    platform!("jupiter-ace", "Jupiter Ace", ["jupiterace"], None, Some(153), Some(126), None),
    platform!("kaios", "KaiOS", [], None, Some(313), None, None),
    platform!("kim-1", "KIM-1", ["kim1"], None, Some(226), None, None),
    platform!("kindle", "Kindle Classic", [], None, Some(145), None, None),
    platform!("laser200", "Laser 200", [], None, Some(264), None, None),
    platform!("laseractive", "LaserActive", [], Some(487), Some(163), None, None),
    platform!("leapfrog-explorer", "LeapFrog Explorer", ["leapsterexplorer"], None, Some(185), None, None),
    platform!("leapster", "Leapster", [], Some(412), Some(183), None, None),
    platform!("leaptv", "LeapTV", [], Some(414), Some(186), None, None),
    platform!("linux", "Linux", [], Some(3), Some(1), Some(145), None),
    platform!("luna", "Luna", [], None, Some(297), None, None),
    platform!("lynx", "Atari Lynx", [], Some(61), Some(18), Some(28), Some(13)),
    platform!("mac", "Mac", ["macintosh"], Some(14), Some(74), Some(146), None),
    platform!("maemo", "Maemo", [], None, Some(157), None, None),
    platform!("mainframe", "Mainframe", [], None, Some(208), None, None),
    platform!("matsushitapanasonic-jr", "Matsushita/Panasonic JR", ["matsushitapanasonicjr"], None, Some(307), None, None),
    platform!("mattel-aquarius", "Mattel Aquarius", ["aquarius"], None, Some(135), None, None),
    platform!("meego", "MeeGo", [], None, Some(158), None, None),
    platform!("memotech-mtx", "Memotech MTX", ["memotechmtx"], None, Some(148), None, None),
    platform!("meritum", "Meritum", [], None, Some(311), None, None),
    platform!("microbee", "Microbee", [], None, Some(200), None, None),
    platform!("microtan-65", "Microtan 65", ["microtan65"], None, Some(232), None, None),
    platform!("microvision--1", "Microvision", ["microvision"], Some(89), Some(97), None, None),
    platform!("mobile", "Legacy Mobile Device", ["mobile-custom"], Some(55), Some(315), None, None),
    platform!("mophun", "Mophun", [], None, Some(71), None, None),
    platform!("mos-technology-6502", "MOS Technology 6502", ["mos6502"], None, Some(240), None, None),
    platform!("motorola-6800", "Motorola 6800", ["motorola6800"], None, Some(235), None, None),
    platform!("motorola-68k", "Motorola 68k", ["motorola68k"], None, Some(275), None, None),
    platform!("mre", "MRE", [], None, Some(229), None, None),
    platform!("msx", "MSX", [], Some(27), Some(57), Some(113), Some(29)),
    platform!("n64", "Nintendo 64", [], Some(4), Some(9), Some(14), Some(2)),
    platform!("nascom", "Nascom", [], None, Some(175), None, None),
    platform!("nds", "Nintendo DS", [], Some(20), Some(44), Some(15), Some(18)),
    platform!("neo-geo-cd", "Neo Geo CD", ["neogeocd"], Some(136), Some(54), Some(70), Some(56)),
    platform!("neo-geo-pocket", "Neo Geo Pocket", ["ngp"], Some(119), Some(52), Some(25), None),
    platform!("neo-geo-x", "Neo Geo X", ["neogeox"], None, Some(279), None, None),
    platform!("neogeoaes", "Neo Geo AES", ["neo-geo"], Some(80), Some(36), Some(142), None),
    platform!("neogeomvs", "Neo Geo MVS", [], Some(79), Some(36), Some(68), None),
    platform!("nes", "Nintendo Entertainment System", ["famicom", "fc"], Some(18), Some(22), Some(3), Some(7)),
    platform!("new-nintendo-3ds", "New Nintendo 3DS", ["new3ds"], Some(137), Some(174), None, None),
    platform!("newbrain", "NewBrain", [], None, Some(177), None, None),
    platform!("newton", "Newton", [], None, Some(207), None, None),
    platform!("ngage", "N-Gage", [], Some(42), Some(32), Some(30), None),
    platform!("ngage2", "N-Gage (service)", [], None, Some(89), None, None),
    platform!("ngc", "Nintendo GameCube", ["gc", "gamecube"], Some(21), Some(14), Some(13), Some(16)),
    platform!("ngpc", "Neo Geo Pocket Color", ["neo-geo-pocket-color"], Some(120), Some(53), Some(82), Some(14)),
    platform!("nintendo-dsi", "Nintendo DSi", ["dsi"], Some(159), Some(87), Some(15), None),
    platform!("northstar", "North Star", [], None, Some(266), None, None),
    platform!("noval-760", "Noval 760", ["noval760"], None, Some(244), None, None),
    platform!("nuon", "Nuon", [], Some(122), Some(116), None, None),
    platform!("oculus-go", "Oculus Go", ["oculusgo"], Some(387), Some(218), None, None),
    platform!("oculus-quest", "Oculus Quest", ["oculusquest"], Some(384), Some(271), None, None),
    platform!("odyssey", "Odyssey", [], None, Some(75), None, None),
    platform!("odyssey-2", "Odyssey 2", ["odyssey2"], None, Some(78), Some(104), Some(23)),
    platform!("ohio-scientific", "Ohio Scientific", ["ohiosci"], None, Some(178), None, None),
    platform!("onlive", "OnLive", [], None, Some(282), None, None),
    platform!("ooparts", "OOParts", [], Some(372), Some(300), None, None),
    platform!("orao", "Orao", [], None, Some(270), None, None),
    platform!("oric", "Oric", [], None, Some(111), Some(131), Some(32)),
    platform!("os2", "OS/2", [], None, Some(146), None, None),
    platform!("ouya", "Ouya", [], Some(72), Some(144), None, None),
    platform!("palm-os", "Palm OS", ["palmos"], Some(417), Some(65), Some(219), None),
    platform!("pandora", "Pandora", [], None, Some(308), None, None),
    platform!("pc", "PC (Microsoft Windows)", ["win", "windows"], Some(6), Some(3), Some(138), None),
    platform!("pc-6001", "PC-6001", ["pc60"], None, Some(149), None, None),
    platform!("pc-8000", "PC-8000", ["pc8000"], None, Some(201), None, None),
    platform!("pc-booter", "PC Booter", ["pcbooter"], None, Some(4), None, None),
    platform!("pc-fx", "PC-FX", ["pcfx"], Some(274), Some(59), Some(72), Some(49)),
    platform!("pc88", "PC-88", [], None, Some(94), Some(221), Some(47)),
    platform!("pc98", "PC-98", [], None, Some(95), Some(208), None),
    platform!("pebble", "Pebble", [], None, Some(304), None, None),
    platform!("pet", "Commodore PET/CBM", [], None, Some(77), Some(240), None),
    platform!("philips-vg-5000", "Philips VG 5000", ["vg5000"], None, Some(133), Some(261), None),
    platform!("photocd", "Photo CD", [], None, Some(272), None, None),
    platform!("pico8", "Pico-8", [], None, None, Some(234), None),
    platform!("pippin", "Pippin", [], None, Some(112), None, None),
    platform!("playdate", "Playdate", [], Some(381), Some(303), None, None),
    platform!("playdia", "Playdia", [], Some(308), Some(107), None, None),
    platform!("playstation-now", "PlayStation Now", ["psnow"], None, Some(294), None, None),
    platform!("plex-arcade", "Plex Arcade", ["plexarcade"], None, Some(291), None, None),
    platform!("pokemon-mini", "Pokemon mini", ["pokemini"], Some(166), Some(152), Some(211), Some(24)),
    platform!("pokitto", "Pokitto", [], None, Some(230), None, None),
    platform!("poly-88", "Poly-88", ["poly88"], None, Some(249), None, None),
    platform!("ps2", "PlayStation 2", [], Some(8), Some(7), Some(58), Some(21)),
    platform!("ps3", "PlayStation 3", [], Some(9), Some(81), Some(59), None),
    platform!("ps4--1", "PlayStation 4", ["ps4", "playstation-4"], Some(48), Some(141), Some(60), None),
    platform!("ps5", "PlayStation 5", ["playstation-5"], Some(167), Some(288), Some(284), None),
    platform!("psp", "PlayStation Portable", [], Some(38), Some(46), Some(61), Some(41)),
    platform!("psvita", "PlayStation Vita", ["ps-vita"], Some(46), Some(105), Some(62), None),
    platform!("psx", "PlayStation", ["ps", "ps1", "playstation"], Some(7), Some(6), Some(57), Some(12)),
    platform!("rca-studio-ii", "RCA Studio II", ["rcastudio2"], None, Some(113), None, None),
    platform!("research-machines-380z", "Research Machines 380Z", ["rm380z"], None, Some(309), None, None),
    platform!("roku", "Roku", [], None, Some(196), None, None),
    platform!("sam-coupe", "SAM Coupé", ["samcoupe"], None, Some(120), Some(213), None),
    platform!("saturn", "Sega Saturn", [], Some(32), Some(23), Some(22), Some(39)),
    platform!("scmp", "SC/MP", [], None, Some(255), None, None),
    platform!("sd-200270290", "SD-200/270/290", ["sd200"], None, Some(267), None, None),
    platform!("sega-pico", "Sega Pico", ["pico"], Some(339), Some(103), Some(250), None),
    platform!("sega32", "Sega 32X", ["32x", "sega32x"], Some(30), Some(21), Some(19), Some(10)),
    platform!("segacd", "Sega CD", ["megacd"], Some(78), Some(20), Some(20), Some(9)),
    platform!("series-x-s", "Xbox Series X|S", ["seriesxs", "xbox-series"], Some(169), Some(289), None, None),
    platform!("sfam", "Super Famicom", [], Some(58), Some(15), None, None),
    platform!("sg1000", "SG-1000", ["sg-1000"], Some(84), Some(114), Some(109), Some(33)),
    platform!("sharp-x68000", "Sharp X68000", ["x68000"], Some(121), Some(106), Some(79), Some(52)),
    platform!("sharp-zaurus", "Sharp Zaurus", ["zaurus"], None, Some(202), None, None),
    platform!("signetics-2650", "Signetics 2650", ["signetics2650"], None, Some(278), None, None),
    platform!("sinclair-ql", "Sinclair QL", ["sinclairql"], Some(406), Some(131), None, None),
    platform!("sk-vm", "SK-VM", ["skvm"], None, Some(259), None, None),
    platform!("smc-777", "SMC-777", ["smc777"], None, Some(273), None, None),
    platform!("sms", "Sega Master System", ["mastersystem"], Some(64), Some(26), Some(2), Some(11)),
    platform!("snes", "Super Nintendo Entertainment System", ["sfc", "superfamicom"], Some(19), Some(15), Some(4), Some(3)),
    platform!("socrates", "Socrates", [], None, Some(190), None, None),
    platform!("sol-20", "Sol-20", ["sol20"], Some(237), Some(199), None, None),
    platform!("sord-m5", "Sord M5", ["sordm5"], None, Some(134), None, None),
    platform!("spectravideo", "Spectravideo", [], None, Some(85), Some(218), None),
    platform!("sri-5001000", "SRI-500/1000", ["sri500"], None, Some(242), None, None),
    platform!("stadia", "Google Stadia", [], Some(170), Some(281), None, None),
    platform!("super-acan", "Super A'Can", ["superacan"], Some(480), Some(110), Some(100), None),
    platform!("super-vision-8000", "Super Vision 8000", ["supervision8000"], None, Some(296), None, None),
    platform!("supergrafx", "PC Engine SuperGrafx", [], Some(128), Some(127), Some(105), None),
    platform!("supervision", "Supervision", [], None, Some(109), Some(207), Some(63)),
    platform!("sure-shot-hd", "Sure Shot HD", ["sureshothd"], None, Some(287), None, None),
    platform!("switch", "Nintendo Switch", [], Some(130), Some(203), Some(225), None),
    platform!("swtpc-6800", "SWTPC 6800", ["swtpc6800"], None, Some(228), None, None),
    platform!("symbian", "Symbian", [], None, Some(67), None, None),
    platform!("tads", "TADS", [], None, Some(171), None, None),
    platform!("taito-x-55", "Taito X-55", ["x55"], None, Some(283), Some(112), None),
    platform!("tatung-einstein", "Tatung Einstein", ["tatungeinstein"], Some(155), Some(150), None, None),
    platform!("tektronix-4050", "Tektronix 4050", ["tektronix4050"], None, Some(223), None, None),
    platform!("tele-spiel", "Tele-Spiel ES-2201", ["telespiel"], None, Some(220), None, None),
    platform!("telstar-arcade", "Telstar Arcade", ["telstar"], None, Some(233), None, None),
    platform!("terminal", "Terminal", [], None, Some(209), None, None),
    platform!("tg16", "TurboGrafx-16/PC Engine", ["pce", "pc-engine", "turbografx16"], Some(86), Some(40), Some(31), Some(8)),
    platform!("thomson-mo", "Thomson MO", ["thomsonmo"], None, Some(147), Some(141), None),
    platform!("thomson-to", "Thomson TO", ["thomsonto"], None, Some(130), None, None),
    platform!("ti-99", "Texas Instruments TI-99", ["ti99"], Some(129), Some(47), Some(205), None),
    platform!("ti-programmable-calculator", "TI Programmable Calculator", ["ticalc"], None, Some(239), None, None),
    platform!("tiki-100", "Tiki 100", ["tiki100"], None, Some(263), None, None),
    platform!("tim", "TIM", [], None, Some(246), None, None),
    platform!("timex-sinclair-2068", "Timex Sinclair 2068", ["timex2068"], None, Some(173), None, None),
    platform!("tizen", "Tizen", [], None, Some(206), None, None),
    platform!("tomahawk-f1", "Tomahawk F1", ["tomahawkf1"], None, Some(256), None, None),
    platform!("tomy-tutor", "Tomy Tutor", ["tutor"], None, Some(151), None, None),
    platform!("triton", "Triton", [], None, Some(310), None, None),
    platform!("trs-80", "TRS-80", ["trs80"], Some(126), Some(58), None, None),
    platform!("trs-80-color-computer", "TRS-80 Color Computer", ["coco", "trs-80-coco"], Some(151), Some(62), Some(144), None),
    platform!("trs-80-mc-10", "TRS-80 MC-10", ["trs80mc10"], None, Some(193), None, None),
    platform!("trs-80-model-100", "TRS-80 Model 100", ["trs80model100"], None, Some(312), None, None),
    platform!("turbografx-cd", "TurboGrafx CD", ["pcenginecd"], None, Some(45), Some(114), None),
    platform!("tvos", "tvOS", [], None, Some(179), None, None),
    platform!("vectrex", "Vectrex", [], Some(70), Some(37), Some(102), Some(46)),
    platform!("versatile", "Versatile", [], None, Some(299), None, None),
    platform!("vflash", "V.Flash", [], None, Some(189), None, None),
    platform!("vic-20", "VIC-20", ["c20"], None, Some(43), Some(73), None),
    platform!("videobrain", "VideoBrain", [], None, Some(214), None, None),
    platform!("videopac-g7400", "Videopac+ G7400", ["videopacplus"], None, Some(128), Some(104), None),
    platform!("virtualboy", "Virtual Boy", ["vb"], Some(87), Some(38), Some(11), Some(28)),
    platform!("vis", "VIS", [], None, Some(164), None, None),
    platform!("vsmile", "V.Smile", [], Some(439), Some(42), Some(120), None),
    platform!("wang2200", "Wang 2200", [], None, Some(217), None, None),
    platform!("watchos", "watchOS", [], None, Some(180), None, None),
    platform!("webos", "webOS", [], None, Some(100), None, None),
    platform!("wii", "Wii", [], Some(5), Some(82), Some(16), Some(19)),
    platform!("wiiu", "Wii U", [], Some(41), Some(132), Some(18), None),
    platform!("win3x", "Windows 3.x", [], None, Some(5), Some(136), None),
    platform!("windows-apps", "Windows Apps", ["windowsapps"], None, Some(140), None, None),
    platform!("windows-mobile", "Windows Mobile", ["windowsmobile"], Some(405), Some(66), None, None),
    platform!("winphone", "Windows Phone", ["windows-phone"], Some(74), Some(98), None, None),
    platform!("wipi", "WIPI", [], None, Some(260), None, None),
    platform!("wonderswan", "WonderSwan", ["ws"], Some(57), Some(48), Some(45), Some(53)),
    platform!("wonderswan-color", "WonderSwan Color", ["wsc"], Some(123), Some(49), Some(46), Some(53)),
    platform!("x1", "Sharp X1", ["sharp-x1"], Some(77), Some(121), Some(220), None),
    platform!("xavixport", "XaviXPORT", [], None, Some(191), None, None),
    platform!("xbox", "Xbox", [], Some(11), Some(13), Some(32), None),
    platform!("xbox360", "Xbox 360", [], Some(12), Some(69), Some(33), None),
    platform!("xboxcloudgaming", "Xbox Cloud Gaming", [], None, Some(293), None, None),
    platform!("xboxone", "Xbox One", ["xbox-one"], Some(49), Some(142), Some(34), None),
    platform!("xerox-alto", "Xerox Alto", ["xeroxalto"], None, Some(254), None, None),
    platform!("z-machine", "Z-machine", ["zmachine"], None, Some(169), Some(215), None),
    platform!("z80", "Zilog Z80", [], None, Some(227), None, None),
    platform!("zeebo", "Zeebo", [], Some(240), Some(88), None, None),
    platform!("zilog-z8000", "Zilog Z8000", ["z8000"], None, Some(276), None, None),
    platform!("zodiac", "Zodiac", [], None, Some(68), None, None),
    platform!("zune", "Zune", [], None, Some(211), None, None),
    platform!("zx-spectrum-next", "ZX Spectrum Next", ["zxsnext"], None, Some(280), None, None),
    platform!("zx80", "ZX80", [], None, Some(118), None, None),
    platform!("zx81", "ZX81", [], None, Some(119), Some(77), None),
    platform!("zxs", "ZX Spectrum", ["zx-spectrum"], Some(26), Some(41), Some(76), Some(59)),
];

impl PlatformDef {
    fn info(&self) -> PlatformInfo {
        PlatformInfo {
            slug: self.slug.to_string(),
            name: self.name.to_string(),
            ids: ProviderPlatformIds {
                igdb: self.igdb,
                moby: self.moby,
                ss: self.ss,
                ra: self.ra,
            },
        }
    }
}

/// Read-only platform lookup
#[derive(Debug, Clone, Default)]
pub struct PlatformTable {
    bindings: BTreeMap<String, String>,
    versions: BTreeMap<String, String>,
}

impl PlatformTable {
    pub fn new(bindings: BTreeMap<String, String>, versions: BTreeMap<String, String>) -> Self {
        Self { bindings, versions }
    }

    fn builtin(slug: &str) -> Option<&'static PlatformDef> {
        BUILTIN_PLATFORMS
            .iter()
            .find(|def| def.slug == slug || def.aliases.contains(&slug))
    }

    /// Resolve a platform folder name; `None` when unresolved
    pub fn resolve(&self, fs_slug: &str) -> Option<PlatformInfo> {
        if let Some(slug) = self.bindings.get(fs_slug) {
            return Some(match Self::builtin(slug) {
                Some(def) => def.info(),
                None => PlatformInfo {
                    slug: slug.clone(),
                    name: slug.clone(),
                    ids: ProviderPlatformIds::default(),
                },
            });
        }

        if let Some(parent) = self.versions.get(fs_slug) {
            if let Some(def) = Self::builtin(parent) {
                let mut info = def.info();
                info.slug = fs_slug.to_string();
                info.name = format!("{} ({})", def.name, fs_slug);
                return Some(info);
            }
        }

        Self::builtin(fs_slug).map(PlatformDef::info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_case_sensitive_lookup() {
        let table = PlatformTable::default();
        let gba = table.resolve("gba").unwrap();
        assert_eq!(gba.slug, "gba");
        assert_eq!(gba.ids.get(ProviderId::Ra), Some(5));
        assert!(table.resolve("GBA").is_none());
        assert!(table.resolve("gba ").is_none());
    }

    #[test]
    fn test_alias_resolves_to_canonical() {
        let table = PlatformTable::default();
        assert_eq!(table.resolve("megadrive").unwrap().slug, "genesis");
        assert_eq!(table.resolve("ps1").unwrap().slug, "psx");
    }

    #[test]
    fn test_config_binding_first() {
        let mut bindings = BTreeMap::new();
        bindings.insert("GBA".to_string(), "gba".to_string());
        bindings.insert("homebrew".to_string(), "homebrew".to_string());
        let table = PlatformTable::new(bindings, BTreeMap::new());

        assert_eq!(table.resolve("GBA").unwrap().slug, "gba");
        let custom = table.resolve("homebrew").unwrap();
        assert_eq!(custom.slug, "homebrew");
        assert_eq!(custom.ids, ProviderPlatformIds::default());
    }

    #[test]
    fn test_version_inherits_parent_ids() {
        let mut versions = BTreeMap::new();
        versions.insert("gba-hacks".to_string(), "gba".to_string());
        let table = PlatformTable::new(BTreeMap::new(), versions);

        let info = table.resolve("gba-hacks").unwrap();
        assert_eq!(info.slug, "gba-hacks");
        assert_eq!(info.ids.igdb, Some(24));
    }

    #[test]
    fn test_table_covers_computers_and_minor_consoles() {
        let table = PlatformTable::default();
        let c64 = table.resolve("c64").unwrap();
        assert_eq!(c64.ids.igdb, Some(15));
        assert_eq!(c64.ids.moby, Some(27));
        assert_eq!(table.resolve("amstradcpc").unwrap().slug, "acpc");
        assert_eq!(table.resolve("colecovision").unwrap().ids.ra, Some(44));
        assert!(table.resolve("atari5200").is_some());
        assert!(BUILTIN_PLATFORMS.len() > 300);
    }

    #[test]
    fn test_folder_names_are_unique_across_table() {
        let mut seen = std::collections::HashSet::new();
        for def in BUILTIN_PLATFORMS {
            for name in std::iter::once(&def.slug).chain(def.aliases.iter()) {
                assert!(seen.insert(*name), "duplicate platform folder name {}", name);
            }
        }
    }

    #[test]
    fn test_unknown_folder_unresolved() {
        assert!(PlatformTable::default().resolve("my-stuff").is_none());
    }
}
